//! Multi-handler callback.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use super::{Callback, Dispatch, Handler, HandlerResult};
use crate::pending::{Listeners, Pending};

/// Ordered handlers plus one-shot futures.
///
/// `call` runs every handler in registration order, dropping those that
/// return [`HandlerResult::Remove`] without skipping the rest, then resolves
/// and clears every pending future in registration order. Handlers registered
/// during a call first run on the next call.
pub struct MultiCallback<V> {
    handlers: Mutex<Vec<Handler<V>>>,
    /// Handlers taken out by the running pass. Only touched under `handlers`.
    running: AtomicUsize,
    dispatch: Dispatch<V>,
    listeners: Listeners<Option<V>>,
}

pub fn multi<V: Clone + Send + 'static>() -> MultiCallback<V> {
    MultiCallback {
        handlers: Mutex::new(Vec::new()),
        running: AtomicUsize::new(0),
        dispatch: Dispatch::default(),
        listeners: Listeners::default(),
    }
}

impl<V: Clone + Send + 'static> MultiCallback<V> {
    fn pass(&self, value: Option<V>) {
        let mut running = {
            let mut handlers = self.handlers.lock();
            self.running.store(handlers.len(), Ordering::Relaxed);
            std::mem::take(&mut *handlers)
        };
        let before = running.len();
        running.retain_mut(|handler| handler(value.as_ref()) == HandlerResult::Keep);
        let removed = before - running.len();

        {
            let mut handlers = self.handlers.lock();
            let added = std::mem::replace(&mut *handlers, running);
            handlers.extend(added);
            self.running.store(0, Ordering::Relaxed);
        }

        let resolved = self.listeners.resolve_all(&value);
        trace!(ran = before, removed, resolved, "multi callback called");
    }
}

impl<V: Clone + Send + 'static> Callback<V> for MultiCallback<V> {
    fn then_boxed(&self, handler: Handler<V>) {
        self.handlers.lock().push(handler);
    }

    fn await_call(&self) -> Pending<Option<V>> {
        self.listeners.register()
    }

    fn call(&self, value: Option<V>) {
        self.dispatch.run(value, |value| self.pass(value));
    }

    fn handler_count(&self) -> usize {
        let handlers = self.handlers.lock();
        handlers.len() + self.running.load(Ordering::Relaxed)
    }

    fn pending_count(&self) -> usize {
        self.listeners.len()
    }
}
