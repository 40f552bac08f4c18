//! Container - value cells with a declared mutability contract.
//!
//! Every container holds zero or one value and exposes a single write
//! operation, `set`, whose meaning depends on the container's *current*
//! [`Mutability`]:
//! - `Modify`: the container itself is updated and returned.
//! - `Fork`: a new container holding the value is returned, the original is untouched.
//! - `Unsupported`: the write fails with an explicit error.
//!
//! # Two layers
//! - **[`Container`]**: object-safe trait implemented by every variant.
//! - **[`ContainerRef`]**: cheap, cloneable handle over `Arc<dyn Container>`.
//!   Handle identity is what distinguishes an in-place write from a fork.
//!
//! Baseline variants live in [`base`]; decorators wrap another handle and add
//! behavior (protection, forking, awaiting, laziness, mapping).

pub mod awaitable;
pub mod base;
pub mod forking;
pub mod lazy;
pub mod mapped;
pub mod protect;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ColdError;
use crate::outcome::Outcome;
use crate::pending::Pending;

pub use self::awaitable::awaitable;
pub use self::base::{atomic, atomic_with, final_immutable, future_immutable, mutable, mutable_empty};
pub use self::forking::{ForkFn, forking};
pub use self::lazy::{lazy, lazy_attempt, lazy_optional};
pub use self::mapped::{bi_mapped, immutable, mapped};
pub use self::protect::{AccessPredicate, Caller, CallerGuard, protect, protect_with};

/// Bounds every stored value satisfies.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

/// What `set` will do right now. State-dependent, not type-dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutability {
    /// The write fails and has no effect.
    Unsupported,
    /// The write returns a new container; the original is not modified.
    Fork,
    /// The write goes through to the instance it was called on.
    Modify,
}

impl Mutability {
    pub fn throws_error(self) -> bool {
        matches!(self, Self::Unsupported)
    }

    pub fn modifies_instance(self) -> bool {
        matches!(self, Self::Modify)
    }
}

/// Result of a successful write at the trait level.
pub enum Written<V> {
    /// The called container now holds the value.
    InPlace,
    /// A new container holds the value.
    Forked(ContainerRef<V>),
}

/// A cell holding zero or one value.
///
/// Every operation may fail: decorators such as [`protect`] reject callers
/// before delegating. After a successful `set`, the container that ends up
/// being returned to the caller reports `is_set() == true` and yields the
/// written value (or its deterministic mapping) from `get()`.
pub trait Container<V>: Send + Sync {
    /// Short name used in errors and logs.
    fn variant(&self) -> &'static str;

    /// The current value. May recompute (mapped) or compute once (lazy).
    fn get(&self) -> Result<Option<V>, ColdError>;

    fn is_set(&self) -> Result<bool, ColdError>;

    fn set(&self, value: V) -> Result<Written<V>, ColdError>;

    fn mutability(&self) -> Result<Mutability, ColdError>;

    /// Whether `await_value(true)` can ever register a listener.
    fn can_await(&self) -> bool {
        false
    }

    /// A future for a value.
    ///
    /// With `listen == false` and a value already present, the future is
    /// resolved immediately. Otherwise containers without awaiting support
    /// fail with `Unsupported`.
    fn await_value(&self, listen: bool) -> Result<Pending<V>, ColdError> {
        if !listen
            && self.is_set()?
            && let Some(value) = self.get()?
        {
            return Ok(Pending::ready(value));
        }
        Err(ColdError::Unsupported {
            variant: self.variant(),
            reason: "awaiting is unsupported",
        })
    }
}

/// Shared handle to a container.
pub struct ContainerRef<V> {
    inner: Arc<dyn Container<V>>,
}

impl<V> Clone for ContainerRef<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for ContainerRef<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerRef")
            .field("variant", &self.inner.variant())
            .finish()
    }
}

impl<V: Value> ContainerRef<V> {
    pub fn new<C>(container: C) -> Self
    where
        C: Container<V> + 'static,
    {
        Self {
            inner: Arc::new(container),
        }
    }

    pub fn variant(&self) -> &'static str {
        self.inner.variant()
    }

    pub fn get(&self) -> Result<Option<V>, ColdError> {
        self.inner.get()
    }

    /// `get()` captured as an [`Outcome`] instead of propagating errors.
    pub fn issue(&self) -> Outcome<V> {
        Outcome::from(self.inner.get())
    }

    pub fn is_set(&self) -> Result<bool, ColdError> {
        self.inner.is_set()
    }

    /// Write a value. Returns this handle when the write happened in place,
    /// or the new container when the write forked.
    pub fn set(&self, value: V) -> Result<ContainerRef<V>, ColdError> {
        match self.inner.set(value)? {
            Written::InPlace => Ok(self.clone()),
            Written::Forked(fork) => Ok(fork),
        }
    }

    pub fn mutability(&self) -> Result<Mutability, ColdError> {
        self.inner.mutability()
    }

    pub fn can_await(&self) -> bool {
        self.inner.can_await()
    }

    /// Await a value, completing early if one is already present.
    pub fn await_value(&self) -> Result<Pending<V>, ColdError> {
        self.inner.await_value(false)
    }

    /// Await the next successful write, ignoring any current value.
    pub fn listen(&self) -> Result<Pending<V>, ColdError> {
        self.inner.await_value(true)
    }

    /// Copy the current value into a fresh mutable container.
    pub fn clone_mutable(&self) -> Result<ContainerRef<V>, ColdError> {
        Ok(match self.get()? {
            Some(value) => mutable(value),
            None => mutable_empty(),
        })
    }

    /// True if both handles point at the same container instance.
    pub fn ptr_eq(&self, other: &ContainerRef<V>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn protected<P>(&self, predicate: P, propagate: bool) -> ContainerRef<V>
    where
        P: Fn(Option<&Caller>) -> bool + Send + Sync + 'static,
    {
        protect(self.clone(), predicate, propagate)
    }

    pub fn forked<F>(&self, fork: F) -> ContainerRef<V>
    where
        F: Fn(&ContainerRef<V>, V) -> ContainerRef<V> + Send + Sync + 'static,
    {
        forking(self.clone(), fork)
    }

    pub fn awaitable(&self) -> ContainerRef<V> {
        awaitable(self.clone())
    }

    pub fn immutable(&self) -> ContainerRef<V> {
        immutable(self.clone())
    }

    pub fn map<R, F>(&self, to: F) -> ContainerRef<R>
    where
        R: Value,
        F: Fn(V) -> R + Send + Sync + 'static,
    {
        mapped(self.clone(), to)
    }

    pub fn bi_map<R, F, G>(&self, to: F, from: G) -> ContainerRef<R>
    where
        R: Value,
        F: Fn(V) -> R + Send + Sync + 'static,
        G: Fn(R) -> V + Send + Sync + 'static,
    {
        bi_mapped(self.clone(), to, from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::unsupported(Mutability::Unsupported, true, false)]
    #[case::fork(Mutability::Fork, false, false)]
    #[case::modify(Mutability::Modify, false, true)]
    fn mutability_flags(#[case] m: Mutability, #[case] throws: bool, #[case] modifies: bool) {
        assert_eq!(m.throws_error(), throws);
        assert_eq!(m.modifies_instance(), modifies);
    }

    #[test]
    fn mutability_serializes_as_screaming_case() {
        let s = serde_json::to_string(&Mutability::Unsupported).unwrap();
        assert_eq!(s, "\"UNSUPPORTED\"");
    }

    #[test]
    fn in_place_set_returns_same_handle() {
        let c = mutable(1);
        let returned = c.set(2).unwrap();
        assert!(returned.ptr_eq(&c));
        assert_eq!(c.get().unwrap(), Some(2));
    }

    #[test]
    fn issue_maps_get_into_outcome() {
        assert_eq!(mutable(3).issue().or_null(), Some(3));
        assert!(future_immutable::<i32>().issue().is_unset());

        let denied = mutable(3).protected(|_| false, false);
        assert!(denied.issue().is_failed());
    }

    #[test]
    fn clone_mutable_copies_value_into_new_instance() {
        let original = final_immutable("a".to_string());
        let copy = original.clone_mutable().unwrap();
        assert!(!copy.ptr_eq(&original));
        assert_eq!(copy.mutability().unwrap(), Mutability::Modify);

        copy.set("b".to_string()).unwrap();
        assert_eq!(original.get().unwrap().as_deref(), Some("a"));
        assert_eq!(copy.get().unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn default_await_completes_when_value_present() {
        let c = final_immutable(10);
        assert!(!c.can_await());
        assert_eq!(c.await_value().unwrap().await.unwrap(), 10);
    }

    #[test]
    fn default_await_fails_when_listening_or_empty() {
        let c = final_immutable(10);
        assert!(c.listen().unwrap_err().is_unsupported());

        let empty = future_immutable::<i32>();
        assert!(empty.await_value().unwrap_err().is_unsupported());
    }

    #[test]
    fn debug_shows_variant() {
        let rendered = format!("{:?}", mutable(1));
        assert!(rendered.contains("mutable"));
    }
}
