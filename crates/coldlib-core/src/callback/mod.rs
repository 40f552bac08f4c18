//! Callback - registrable handlers bridged with one-shot futures.
//!
//! A callback is invoked with `call(value)`. Registered handlers run
//! synchronously on the calling thread; futures obtained from `await_call()`
//! resolve with the same value.
//!
//! # Variants
//! - **[`mono`]**: one replaceable handler slot.
//! - **[`multi`]**: an ordered handler list; handlers may remove themselves.
//!
//! Both variants guard their state with a lock that is *not* held while
//! handlers run, so a handler may register further handlers or futures.
//!
//! Calls on one callback never overlap. A call from another thread waits for
//! the running dispatch pass; a call made from inside a handler is queued and
//! replayed once the current pass finishes.

pub mod mono;
pub mod multi;

pub use self::mono::{MonoCallback, mono};
pub use self::multi::{MultiCallback, multi};

use std::cell::RefCell;
use std::collections::VecDeque;

use parking_lot::ReentrantMutex;

use crate::pending::Pending;

/// Returned by a handler after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    Keep,
    Remove,
}

/// A boxed handler. Receives `None` for valueless calls.
pub type Handler<V> = Box<dyn FnMut(Option<&V>) -> HandlerResult + Send>;

pub trait Callback<V>: Send + Sync {
    /// Register an already boxed handler.
    fn then_boxed(&self, handler: Handler<V>);

    /// A future resolved by the next `call`.
    fn await_call(&self) -> Pending<Option<V>>;

    fn call(&self, value: Option<V>);

    /// Number of registered handlers.
    fn handler_count(&self) -> usize;

    /// Number of unresolved futures.
    fn pending_count(&self) -> usize;

    /// Same as `call(None)`.
    fn call_empty(&self) {
        self.call(None);
    }

    fn then<F>(&self, handler: F) -> &Self
    where
        Self: Sized,
        F: FnMut(Option<&V>) -> HandlerResult + Send + 'static,
    {
        self.then_boxed(Box::new(handler));
        self
    }

    /// Register a handler that always stays registered.
    fn then_consume<F>(&self, mut consumer: F) -> &Self
    where
        Self: Sized,
        F: FnMut(Option<&V>) + Send + 'static,
    {
        self.then(move |value| {
            consumer(value);
            HandlerResult::Keep
        })
    }
}

/// Calls queued by handlers of the running pass. `None` while idle.
type Queue<V> = RefCell<Option<VecDeque<Option<V>>>>;

/// Serializes dispatch passes of one callback.
///
/// The lock is reentrant so a handler calling its own callback does not
/// deadlock; the inner call is queued instead of run in the middle of the
/// current pass.
pub(crate) struct Dispatch<V> {
    queue: ReentrantMutex<Queue<V>>,
}

impl<V> Default for Dispatch<V> {
    fn default() -> Self {
        Self {
            queue: ReentrantMutex::new(RefCell::new(None)),
        }
    }
}

impl<V> Dispatch<V> {
    /// Run `pass` for `value` and then for every call queued meanwhile.
    pub(crate) fn run(&self, value: Option<V>, mut pass: impl FnMut(Option<V>)) {
        let guard = self.queue.lock();
        {
            let mut queue = guard.borrow_mut();
            if let Some(queue) = queue.as_mut() {
                queue.push_back(value);
                return;
            }
            *queue = Some(VecDeque::new());
        }

        let _idle = ResetOnDrop(&*guard);
        let mut next = Some(value);
        while let Some(value) = next {
            pass(value);
            next = guard.borrow_mut().as_mut().and_then(VecDeque::pop_front);
        }
    }
}

/// Marks the dispatcher idle again, also when a handler panics.
struct ResetOnDrop<'a, V>(&'a Queue<V>);

impl<V> Drop for ResetOnDrop<'_, V> {
    fn drop(&mut self) {
        *self.0.borrow_mut() = None;
    }
}
