//! Access-protected containers.
//!
//! Callers identify themselves by entering a [`Caller`] scope on the current
//! thread before touching a protected container:
//!
//! ```ignore
//! let guarded = protect(config, |caller| caller.is_some_and(|c| c.id() == "admin"), false);
//!
//! let _entered = Caller::new("admin").enter();
//! guarded.set(new_config)?;
//! ```
//!
//! Operations without a matching caller fail with `AccessDenied` before the
//! wrapped container is touched. The scope is thread-local, so it does not
//! follow a task across `.await` points on a multi-threaded runtime.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::warn;

use super::{Container, ContainerRef, Mutability, Value, Written};
use crate::error::ColdError;
use crate::pending::Pending;

thread_local! {
    static CALLERS: RefCell<Vec<Caller>> = const { RefCell::new(Vec::new()) };
}

/// Identity token presented to protected containers.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    id: Arc<str>,
}

impl Caller {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Make this the current caller until the guard is dropped.
    ///
    /// Scopes nest; guards must be dropped in reverse order of entering.
    pub fn enter(&self) -> CallerGuard {
        CALLERS.with(|callers| callers.borrow_mut().push(self.clone()));
        CallerGuard {
            _not_send: PhantomData,
        }
    }

    /// Run `f` with this caller entered.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let _entered = self.enter();
        f()
    }

    /// The innermost entered caller on this thread.
    pub fn current() -> Option<Caller> {
        CALLERS.with(|callers| callers.borrow().last().cloned())
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Caller({})", self.id)
    }
}

/// Leaves the caller scope on drop.
#[must_use = "the caller scope ends when the guard is dropped"]
pub struct CallerGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for CallerGuard {
    fn drop(&mut self) {
        CALLERS.with(|callers| {
            callers.borrow_mut().pop();
        });
    }
}

/// Decides whether the current caller (if any) may access a container.
pub type AccessPredicate = Arc<dyn Fn(Option<&Caller>) -> bool + Send + Sync>;

struct Protected<V> {
    wrapped: ContainerRef<V>,
    predicate: AccessPredicate,
    propagate: bool,
}

impl<V> Protected<V> {
    fn check_access(&self) -> Result<(), ColdError> {
        let caller = Caller::current();
        if (self.predicate)(caller.as_ref()) {
            return Ok(());
        }
        warn!(
            caller = caller.as_ref().map(Caller::id),
            variant = self.wrapped.inner.variant(),
            "access to protected container denied"
        );
        Err(ColdError::AccessDenied {
            caller: caller.map(|c| c.id().to_string()),
        })
    }
}

impl<V: Value> Container<V> for Protected<V> {
    fn variant(&self) -> &'static str {
        "protected"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        self.check_access()?;
        self.wrapped.get()
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        self.check_access()?;
        self.wrapped.is_set()
    }

    fn set(&self, value: V) -> Result<Written<V>, ColdError> {
        self.check_access()?;
        match self.wrapped.inner.set(value)? {
            Written::Forked(fork) if self.propagate => Ok(Written::Forked(protect_with(
                fork,
                Arc::clone(&self.predicate),
                true,
            ))),
            // an unprotected fork is not handed out; the caller keeps this wrapper
            _ => Ok(Written::InPlace),
        }
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        self.check_access()?;
        self.wrapped.mutability()
    }

    fn can_await(&self) -> bool {
        self.wrapped.can_await()
    }

    fn await_value(&self, listen: bool) -> Result<Pending<V>, ColdError> {
        self.check_access()?;
        self.wrapped.inner.await_value(listen)
    }
}

/// Guard `container` behind `predicate`.
///
/// When the wrapped container forks on `set` and `propagate` is true, the
/// fork is protected by the same predicate before being returned.
pub fn protect<V, P>(container: ContainerRef<V>, predicate: P, propagate: bool) -> ContainerRef<V>
where
    V: Value,
    P: Fn(Option<&Caller>) -> bool + Send + Sync + 'static,
{
    protect_with(container, Arc::new(predicate), propagate)
}

/// [`protect`] with an already shared predicate.
pub fn protect_with<V: Value>(
    container: ContainerRef<V>,
    predicate: AccessPredicate,
    propagate: bool,
) -> ContainerRef<V> {
    ContainerRef::new(Protected {
        wrapped: container,
        predicate,
        propagate,
    })
}
