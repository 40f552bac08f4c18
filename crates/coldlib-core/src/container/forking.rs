//! Forking containers: writes produce a new container, never a mutation.

use std::sync::Arc;

use super::{Container, ContainerRef, Mutability, Value, Written};
use crate::error::ColdError;
use crate::pending::Pending;

/// Builds the fork for a write: receives the wrapped container and the value.
pub type ForkFn<V> = Arc<dyn Fn(&ContainerRef<V>, V) -> ContainerRef<V> + Send + Sync>;

struct Forking<V> {
    wrapped: ContainerRef<V>,
    fork: ForkFn<V>,
}

impl<V: Value> Container<V> for Forking<V> {
    fn variant(&self) -> &'static str {
        "forking"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        self.wrapped.get()
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        self.wrapped.is_set()
    }

    fn set(&self, value: V) -> Result<Written<V>, ColdError> {
        Ok(Written::Forked((self.fork)(&self.wrapped, value)))
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        Ok(Mutability::Fork)
    }

    fn can_await(&self) -> bool {
        self.wrapped.can_await()
    }

    fn await_value(&self, listen: bool) -> Result<Pending<V>, ColdError> {
        self.wrapped.inner.await_value(listen)
    }
}

/// Wrap `container` so every write calls `fork` and returns its result.
///
/// The wrapped container is passed to `fork` by reference only; this wrapper
/// never writes to it.
pub fn forking<V, F>(container: ContainerRef<V>, fork: F) -> ContainerRef<V>
where
    V: Value,
    F: Fn(&ContainerRef<V>, V) -> ContainerRef<V> + Send + Sync + 'static,
{
    ContainerRef::new(Forking {
        wrapped: container,
        fork: Arc::new(fork),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{awaitable, final_immutable, future_immutable, mutable};

    #[test]
    fn set_returns_distinct_container_and_leaves_inner_alone() {
        let inner = mutable("original".to_string());
        let c = forking(inner.clone(), |_, v| mutable(v));

        let fork = c.set("changed".to_string()).unwrap();
        assert!(!fork.ptr_eq(&c));
        assert!(!fork.ptr_eq(&inner));
        assert_eq!(fork.get().unwrap().as_deref(), Some("changed"));
        assert_eq!(inner.get().unwrap().as_deref(), Some("original"));
        assert_eq!(c.get().unwrap().as_deref(), Some("original"));
    }

    #[test]
    fn mutability_is_always_fork() {
        let c = forking(final_immutable(1), |_, v| final_immutable(v));
        assert_eq!(c.mutability().unwrap(), Mutability::Fork);
        assert_eq!(c.set(2).unwrap().get().unwrap(), Some(2));
        assert_eq!(c.mutability().unwrap(), Mutability::Fork);
    }

    #[test]
    fn fork_function_sees_wrapped_container() {
        let c = forking(mutable(10), |base, v| {
            let current = base.get().ok().flatten().unwrap_or_default();
            mutable(current + v)
        });
        assert_eq!(c.set(5).unwrap().get().unwrap(), Some(15));
    }

    #[test]
    fn forks_can_fork_again() {
        let c = mutable(1).forked(|_, v| mutable(v).forked(|_, v| mutable(v * 100)));
        let first = c.set(2).unwrap();
        assert_eq!(first.get().unwrap(), Some(2));
        assert_eq!(first.set(3).unwrap().get().unwrap(), Some(300));
        assert_eq!(first.get().unwrap(), Some(2));
    }

    #[tokio::test]
    async fn awaiting_goes_through_to_the_wrapped_container() {
        let inner = awaitable(future_immutable::<u8>());
        let c = forking(inner.clone(), |_, v| final_immutable(v));
        assert!(c.can_await());
        assert!(!forking(mutable(1u8), |_, v| mutable(v)).can_await());

        let pending = c.listen().unwrap();
        inner.set(3).unwrap();
        assert_eq!(pending.await.unwrap(), 3);
    }
}
