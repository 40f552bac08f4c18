//! Error taxonomy shared by containers, outcomes, callbacks and the registry.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced synchronously by the framework.
///
/// Cloneable so a single failure can reject every pending listener.
#[derive(Debug, Clone, Error)]
pub enum ColdError {
    #[error("{variant} container does not support this operation: {reason}")]
    Unsupported {
        variant: &'static str,
        reason: &'static str,
    },

    #[error("{variant} container already has a value set")]
    AlreadySet { variant: &'static str },

    #[error("access to container denied for caller {}", .caller.as_deref().unwrap_or("<anonymous>"))]
    AccessDenied { caller: Option<String> },

    #[error("absent value")]
    AbsentValue {
        #[source]
        source: Option<Failure>,
    },

    #[error("operation failed: {0}")]
    OperationFailed(#[source] Failure),

    #[error("pending value abandoned before it was resolved")]
    Abandoned,
}

impl ColdError {
    pub(crate) fn immutable(variant: &'static str) -> Self {
        Self::Unsupported {
            variant,
            reason: "container is immutable",
        }
    }

    /// True for both `Unsupported` and its `AlreadySet` special case.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. } | Self::AlreadySet { .. })
    }
}

/// A type-erased, cloneable failure cause.
#[derive(Clone)]
pub struct Failure(Arc<dyn StdError + Send + Sync + 'static>);

/// Cause used when a failure is reported without one.
#[derive(Debug, Error)]
#[error("failed, no further information")]
struct Unspecified;

impl Failure {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    pub fn unspecified() -> Self {
        Self::new(Unspecified)
    }

    /// Build a failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: Box<dyn StdError + Send + Sync> = message.into().into();
        Self(Arc::from(message))
    }

    pub fn is_unspecified(&self) -> bool {
        self.0.is::<Unspecified>()
    }

    /// Borrow the underlying cause.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }

    /// Downcast the cause to a concrete error type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&self.0).finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<ColdError> for Failure {
    fn from(error: ColdError) -> Self {
        match error {
            ColdError::OperationFailed(failure) => failure,
            other => Failure::new(other),
        }
    }
}
