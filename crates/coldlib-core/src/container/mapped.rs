//! Read-only views and value-mapping decorators.

use std::sync::Arc;

use super::{Container, ContainerRef, Mutability, Value, Written};
use crate::error::ColdError;
use crate::pending::Pending;

type MapFn<A, B> = Arc<dyn Fn(A) -> B + Send + Sync>;

/// Read-through view that rejects writes. The wrapped container can still be
/// written through its own handle.
struct Immutable<V> {
    wrapped: ContainerRef<V>,
}

impl<V: Value> Container<V> for Immutable<V> {
    fn variant(&self) -> &'static str {
        "immutable"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        self.wrapped.get()
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        self.wrapped.is_set()
    }

    fn set(&self, _value: V) -> Result<Written<V>, ColdError> {
        Err(ColdError::immutable(self.variant()))
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        Ok(Mutability::Unsupported)
    }

    fn can_await(&self) -> bool {
        self.wrapped.can_await()
    }

    fn await_value(&self, listen: bool) -> Result<Pending<V>, ColdError> {
        self.wrapped.inner.await_value(listen)
    }
}

/// Read-only projection through `to`.
struct Mapped<V, R> {
    wrapped: ContainerRef<V>,
    to: MapFn<V, R>,
}

impl<V: Value, R: Value> Container<R> for Mapped<V, R> {
    fn variant(&self) -> &'static str {
        "mapped"
    }

    fn get(&self) -> Result<Option<R>, ColdError> {
        Ok(self.wrapped.get()?.map(|v| (self.to)(v)))
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        self.wrapped.is_set()
    }

    fn set(&self, _value: R) -> Result<Written<R>, ColdError> {
        Err(ColdError::immutable(self.variant()))
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        Ok(Mutability::Unsupported)
    }
}

/// Two-way mapping: reads go through `to`, writes through `from`.
struct BiMapped<V, R> {
    wrapped: ContainerRef<V>,
    to: MapFn<V, R>,
    from: MapFn<R, V>,
}

impl<V: Value, R: Value> Container<R> for BiMapped<V, R> {
    fn variant(&self) -> &'static str {
        "bi_mapped"
    }

    fn get(&self) -> Result<Option<R>, ColdError> {
        Ok(self.wrapped.get()?.map(|v| (self.to)(v)))
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        self.wrapped.is_set()
    }

    fn set(&self, value: R) -> Result<Written<R>, ColdError> {
        match self.wrapped.inner.set((self.from)(value))? {
            Written::InPlace => Ok(Written::InPlace),
            Written::Forked(fork) => Ok(Written::Forked(bi_mapped_with(
                fork,
                Arc::clone(&self.to),
                Arc::clone(&self.from),
            ))),
        }
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        self.wrapped.mutability()
    }
}

pub fn immutable<V: Value>(container: ContainerRef<V>) -> ContainerRef<V> {
    ContainerRef::new(Immutable { wrapped: container })
}

/// Read-only view of `container` with every value passed through `to`.
pub fn mapped<V, R, F>(container: ContainerRef<V>, to: F) -> ContainerRef<R>
where
    V: Value,
    R: Value,
    F: Fn(V) -> R + Send + Sync + 'static,
{
    ContainerRef::new(Mapped {
        wrapped: container,
        to: Arc::new(to),
    })
}

/// Two-way mapped view of `container`. Keeps the wrapped container's
/// mutability; a forked write is mapped the same way.
pub fn bi_mapped<V, R, F, G>(container: ContainerRef<V>, to: F, from: G) -> ContainerRef<R>
where
    V: Value,
    R: Value,
    F: Fn(V) -> R + Send + Sync + 'static,
    G: Fn(R) -> V + Send + Sync + 'static,
{
    bi_mapped_with(container, Arc::new(to), Arc::new(from))
}

fn bi_mapped_with<V: Value, R: Value>(
    container: ContainerRef<V>,
    to: MapFn<V, R>,
    from: MapFn<R, V>,
) -> ContainerRef<R> {
    ContainerRef::new(BiMapped {
        wrapped: container,
        to,
        from,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{awaitable, forking, future_immutable, mutable};

    #[test]
    fn immutable_view_rejects_writes_but_tracks_source() {
        let source = mutable(1);
        let view = immutable(source.clone());
        assert_eq!(view.mutability().unwrap(), Mutability::Unsupported);
        assert!(matches!(view.set(2), Err(ColdError::Unsupported { variant: "immutable", .. })));

        source.set(3).unwrap();
        assert_eq!(view.get().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn immutable_view_can_still_await() {
        let source = awaitable(future_immutable::<u8>());
        let view = source.immutable();
        assert!(view.can_await());

        let pending = view.await_value().unwrap();
        source.set(5).unwrap();
        assert_eq!(pending.await.unwrap(), 5);
    }

    #[test]
    fn mapped_projects_reads_and_rejects_writes() {
        let source = mutable(21);
        let doubled = mapped(source.clone(), |v: i32| v * 2);
        assert_eq!(doubled.get().unwrap(), Some(42));
        assert!(doubled.set(1).unwrap_err().is_unsupported());

        source.set(5).unwrap();
        assert_eq!(doubled.get().unwrap(), Some(10));
    }

    #[test]
    fn mapped_keeps_absence() {
        let view = future_immutable::<i32>().map(|v| v.to_string());
        assert_eq!(view.get().unwrap(), None);
        assert!(!view.is_set().unwrap());
    }

    #[test]
    fn bi_mapped_writes_through_reverse_mapping() {
        let celsius = mutable(0.0f64);
        let fahrenheit = celsius.bi_map(|c| c * 9.0 / 5.0 + 32.0, |f| (f - 32.0) * 5.0 / 9.0);

        assert_eq!(fahrenheit.get().unwrap(), Some(32.0));
        let returned = fahrenheit.set(212.0).unwrap();
        assert!(returned.ptr_eq(&fahrenheit));
        assert_eq!(celsius.get().unwrap(), Some(100.0));
        assert_eq!(fahrenheit.mutability().unwrap(), Mutability::Modify);
    }

    #[test]
    fn bi_mapped_inherits_inner_failures() {
        let inner = future_immutable::<String>();
        let lengths = inner.bi_map(|s| s.len(), |n| "x".repeat(n));

        lengths.set(3).unwrap();
        assert_eq!(inner.get().unwrap().as_deref(), Some("xxx"));
        assert_eq!(lengths.mutability().unwrap(), Mutability::Unsupported);
        assert!(matches!(lengths.set(4), Err(ColdError::AlreadySet { .. })));
    }

    #[test]
    fn bi_mapped_maps_forks() {
        let inner = forking(mutable(1i64), |_, v| mutable(v));
        let text = inner.bi_map(|v| v.to_string(), |s: String| s.parse().unwrap_or_default());

        let fork = text.set("7".to_string()).unwrap();
        assert!(!fork.ptr_eq(&text));
        assert_eq!(fork.get().unwrap().as_deref(), Some("7"));
        assert_eq!(inner.get().unwrap(), Some(1));
        assert_eq!(text.mutability().unwrap(), Mutability::Fork);
    }
}
