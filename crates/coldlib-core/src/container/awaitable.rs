//! Awaitable containers: futures resolved by the next successful write.

use tracing::debug;

use super::{Container, ContainerRef, Mutability, Value, Written};
use crate::error::ColdError;
use crate::pending::{Listeners, Pending};

struct Awaitable<V> {
    wrapped: ContainerRef<V>,
    listeners: Listeners<V>,
}

impl<V: Value> Container<V> for Awaitable<V> {
    fn variant(&self) -> &'static str {
        "awaitable"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        self.wrapped.get()
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        self.wrapped.is_set()
    }

    /// Delegates the write, then settles every pending listener with either
    /// the written value or the write's error. Errors still propagate.
    fn set(&self, value: V) -> Result<Written<V>, ColdError> {
        match self.wrapped.inner.set(value.clone()) {
            Ok(written) => {
                let resolved = self.listeners.resolve_all(&value);
                debug!(
                    variant = self.wrapped.variant(),
                    resolved, "awaitable container resolved listeners"
                );
                Ok(written)
            }
            Err(err) => {
                let rejected = self.listeners.reject_all(&err);
                debug!(
                    variant = self.wrapped.variant(),
                    rejected,
                    error = %err,
                    "awaitable container rejected listeners"
                );
                Err(err)
            }
        }
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        self.wrapped.mutability()
    }

    fn can_await(&self) -> bool {
        true
    }

    /// Listeners are only ever resolved by a later write, never by one that
    /// already happened.
    fn await_value(&self, listen: bool) -> Result<Pending<V>, ColdError> {
        if !listen
            && self.wrapped.is_set()?
            && let Some(value) = self.wrapped.get()?
        {
            return Ok(Pending::ready(value));
        }
        Ok(self.listeners.register())
    }
}

/// Add awaiting to `container`.
///
/// Writes that fork return the fork unchanged; the fork itself is not awaitable.
pub fn awaitable<V: Value>(container: ContainerRef<V>) -> ContainerRef<V> {
    ContainerRef::new(Awaitable {
        wrapped: container,
        listeners: Listeners::default(),
    })
}
