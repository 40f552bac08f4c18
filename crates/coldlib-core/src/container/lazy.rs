//! Lazily computed, immutable containers.

use std::sync::OnceLock;

use parking_lot::Mutex;

use super::{Container, ContainerRef, Mutability, Value, Written};
use crate::error::{ColdError, Failure};
use crate::outcome::{Outcome, attempt};

type Supplier<V> = Box<dyn FnOnce() -> Outcome<V> + Send>;

/// Runs its supplier on the first `get()` and caches whatever it produced,
/// including "no value" and failures.
struct Lazy<V> {
    supplier: Mutex<Option<Supplier<V>>>,
    cached: OnceLock<Outcome<V>>,
}

impl<V: Value> Lazy<V> {
    fn load(&self) -> &Outcome<V> {
        self.cached.get_or_init(|| match self.supplier.lock().take() {
            Some(supplier) => supplier(),
            None => Outcome::unset(),
        })
    }
}

impl<V: Value> Container<V> for Lazy<V> {
    fn variant(&self) -> &'static str {
        "lazy"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        match self.load() {
            Outcome::Success(value) => Ok(Some(value.clone())),
            Outcome::Unset => Ok(None),
            Outcome::Failed(cause) => Err(ColdError::OperationFailed(cause.clone())),
        }
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        Ok(true)
    }

    fn set(&self, _value: V) -> Result<Written<V>, ColdError> {
        Err(ColdError::immutable(self.variant()))
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        Ok(Mutability::Unsupported)
    }
}

fn from_supplier<V: Value>(supplier: Supplier<V>) -> ContainerRef<V> {
    ContainerRef::new(Lazy {
        supplier: Mutex::new(Some(supplier)),
        cached: OnceLock::new(),
    })
}

/// Compute the value once, on first `get()`.
///
/// The supplier must not read the same container; doing so blocks forever.
pub fn lazy<V, F>(supplier: F) -> ContainerRef<V>
where
    V: Value,
    F: FnOnce() -> V + Send + 'static,
{
    from_supplier(Box::new(move || Outcome::success(supplier())))
}

/// Like [`lazy`], for suppliers that may produce no value.
pub fn lazy_optional<V, F>(supplier: F) -> ContainerRef<V>
where
    V: Value,
    F: FnOnce() -> Option<V> + Send + 'static,
{
    from_supplier(Box::new(move || match supplier() {
        Some(value) => Outcome::success(value),
        None => Outcome::unset(),
    }))
}

/// Like [`lazy`], for fallible suppliers. A failure is cached and reported
/// as `OperationFailed` on every `get()`.
pub fn lazy_attempt<V, E, F>(supplier: F) -> ContainerRef<V>
where
    V: Value,
    E: Into<Failure>,
    F: FnOnce() -> Result<V, E> + Send + 'static,
{
    from_supplier(Box::new(move || attempt(supplier)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn counted<V: Value>(value: V) -> (Arc<AtomicUsize>, impl FnOnce() -> V + Send + 'static) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        (calls, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            value
        })
    }

    #[test]
    fn supplier_runs_once_across_many_gets() {
        let (calls, supplier) = counted("computed".to_string());
        let c = lazy(supplier);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        for _ in 0..5 {
            assert_eq!(c.get().unwrap().as_deref(), Some("computed"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn absent_result_is_cached_too() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let c = lazy_optional::<u8, _>(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        assert_eq!(c.get().unwrap(), None);
        assert_eq!(c.get().unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(c.is_set().unwrap());
    }

    #[test]
    fn writes_are_rejected() {
        let c = lazy(|| 1);
        assert_eq!(c.mutability().unwrap(), Mutability::Unsupported);
        assert!(matches!(c.set(2), Err(ColdError::Unsupported { variant: "lazy", .. })));
        assert_eq!(c.get().unwrap(), Some(1));
    }

    #[test]
    fn failures_are_cached_and_reported() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let c = lazy_attempt::<u8, _, _>(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ColdError::Abandoned)
        });

        assert!(matches!(c.get(), Err(ColdError::OperationFailed(_))));
        assert!(c.issue().is_failed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_gets_share_one_computation() {
        let (calls, supplier) = counted(99u64);
        let c = lazy(supplier);

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let c = c.clone();
                thread::spawn(move || c.get().unwrap())
            })
            .collect();
        for r in readers {
            assert_eq!(r.join().unwrap(), Some(99));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
