//! Single-handler callback.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use super::{Callback, Dispatch, Handler, HandlerResult};
use crate::pending::{Listeners, Pending};

/// One replaceable handler slot plus the futures awaiting the next call.
///
/// All futures obtained before a call resolve together on that call. A future
/// obtained afterwards waits for the following call.
pub struct MonoCallback<V> {
    handler: Mutex<Option<Handler<V>>>,
    /// Set while the running pass holds the handler. Only touched under `handler`.
    running: AtomicBool,
    dispatch: Dispatch<V>,
    listeners: Listeners<Option<V>>,
}

pub fn mono<V: Clone + Send + 'static>() -> MonoCallback<V> {
    MonoCallback {
        handler: Mutex::new(None),
        running: AtomicBool::new(false),
        dispatch: Dispatch::default(),
        listeners: Listeners::default(),
    }
}

impl<V: Clone + Send + 'static> MonoCallback<V> {
    fn pass(&self, value: Option<V>) {
        let taken = {
            let mut slot = self.handler.lock();
            let taken = slot.take();
            self.running.store(taken.is_some(), Ordering::Relaxed);
            taken
        };
        if let Some(mut handler) = taken {
            let result = handler(value.as_ref());
            let mut slot = self.handler.lock();
            self.running.store(false, Ordering::Relaxed);
            match result {
                // a handler registered while this one ran takes precedence
                HandlerResult::Keep if slot.is_none() => *slot = Some(handler),
                HandlerResult::Keep => {}
                HandlerResult::Remove => trace!("mono callback handler removed itself"),
            }
        }

        let resolved = self.listeners.resolve_all(&value);
        trace!(resolved, "mono callback called");
    }
}

impl<V: Clone + Send + 'static> Callback<V> for MonoCallback<V> {
    /// Replaces the current handler.
    fn then_boxed(&self, handler: Handler<V>) {
        *self.handler.lock() = Some(handler);
    }

    fn await_call(&self) -> Pending<Option<V>> {
        self.listeners.register()
    }

    fn call(&self, value: Option<V>) {
        self.dispatch.run(value, |value| self.pass(value));
    }

    fn handler_count(&self) -> usize {
        let slot = self.handler.lock();
        usize::from(slot.is_some() || self.running.load(Ordering::Relaxed))
    }

    fn pending_count(&self) -> usize {
        self.listeners.len()
    }
}
