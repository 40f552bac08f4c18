//! One-shot futures handed out by `await` on containers and callbacks.
//!
//! A [`Pending`] is resolved exactly once, from whichever thread performs the
//! resolving `set`/`call`. Nothing here schedules work: the future only
//! completes when an external caller resolves it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::ColdError;

type Slot<T> = Result<T, ColdError>;

/// Future resolving to the value of the next successful write, or the error
/// that rejected it.
///
/// If the resolving side is dropped first, resolves to `ColdError::Abandoned`.
#[derive(Debug)]
#[must_use = "a pending value does nothing unless awaited or polled"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Slot<T>>,
}

impl<T> Pending<T> {
    fn channel() -> (oneshot::Sender<Slot<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// An already resolved future.
    pub fn ready(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// An already rejected future.
    pub fn rejected(error: ColdError) -> Self {
        Self::settled(Err(error))
    }

    fn settled(slot: Slot<T>) -> Self {
        let (tx, pending) = Self::channel();
        // receiver is alive, send cannot fail
        let _ = tx.send(slot);
        pending
    }

    /// Take the result without waiting. `None` while still unresolved.
    pub fn try_take(&mut self) -> Option<Result<T, ColdError>> {
        match self.rx.try_recv() {
            Ok(slot) => Some(slot),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(ColdError::Abandoned)),
        }
    }

    /// Block the current thread until resolved. Must not be called from
    /// within an async runtime.
    pub fn blocking_wait(self) -> Result<T, ColdError> {
        self.rx.blocking_recv().unwrap_or(Err(ColdError::Abandoned))
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, ColdError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(slot)) => Poll::Ready(slot),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ColdError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Ordered list of unresolved listeners.
///
/// Resolution drains the list under the lock and completes the senders after
/// releasing it, so a listener woken on another thread can register again
/// without contention.
#[derive(Debug)]
pub(crate) struct Listeners<T> {
    senders: Mutex<Vec<oneshot::Sender<Slot<T>>>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Listeners<T> {
    pub(crate) fn register(&self) -> Pending<T> {
        let (tx, pending) = Pending::channel();
        let mut senders = self.senders.lock();
        senders.retain(|s| !s.is_closed());
        senders.push(tx);
        pending
    }

    /// Resolve and clear every listener in registration order.
    pub(crate) fn resolve_all(&self, value: &T) -> usize {
        self.settle_all(|| Ok(value.clone()))
    }

    /// Reject and clear every listener in registration order.
    pub(crate) fn reject_all(&self, error: &ColdError) -> usize {
        self.settle_all(|| Err(error.clone()))
    }

    fn settle_all(&self, slot: impl Fn() -> Slot<T>) -> usize {
        let drained = std::mem::take(&mut *self.senders.lock());
        let count = drained.len();
        for tx in drained {
            // ignore send error: the listener may have been dropped
            let _ = tx.send(slot());
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.lock().len()
    }
}
