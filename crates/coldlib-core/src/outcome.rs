//! Outcome model: the tri-state result of an operation that may fail.
//!
//! - `Success`: the operation produced a value.
//! - `Unset`: nothing went wrong, but there is no value either.
//! - `Failed`: the operation failed with a cause.
//!
//! `Outcome` is the opt-in deferred-failure mechanism. Code that does not want
//! a failure to propagate converts the fallible call with [`attempt`].

use crate::error::{ColdError, Failure};

#[derive(Debug, Clone)]
pub enum Outcome<V> {
    Success(V),
    Unset,
    Failed(Failure),
}

impl<V> Outcome<V> {
    pub fn success(value: V) -> Self {
        Self::Success(value)
    }

    pub fn unset() -> Self {
        Self::Unset
    }

    /// Failed outcome. `None` is replaced by the unspecified cause.
    pub fn failed(cause: impl Into<Option<Failure>>) -> Self {
        Self::Failed(cause.into().unwrap_or_else(Failure::unspecified))
    }

    /// True only for `Success`, even when the success value itself is empty.
    /// Unset outcomes are not present but report no error either.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The failure cause, if any. Unset outcomes never report an error.
    pub fn error(&self) -> Option<&Failure> {
        match self {
            Self::Failed(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn or_null(self) -> Option<V> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn or_else(self, default: V) -> V {
        self.or_null().unwrap_or(default)
    }

    pub fn or_else_get(self, default: impl FnOnce() -> V) -> V {
        self.or_null().unwrap_or_else(default)
    }

    /// The value, or `AbsentValue` chaining the original cause if there was one.
    pub fn try_unwrap(self) -> Result<V, ColdError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Unset => Err(ColdError::AbsentValue { source: None }),
            Self::Failed(cause) => Err(ColdError::AbsentValue {
                source: Some(cause),
            }),
        }
    }

    /// Propagate the original failure, otherwise hand the outcome back.
    pub fn rethrow_failed(self) -> Result<Self, Failure> {
        match self {
            Self::Failed(cause) => Err(cause),
            other => Ok(other),
        }
    }

    /// Propagate the original failure, otherwise return the value if any.
    pub fn or_rethrow(self) -> Result<Option<V>, Failure> {
        match self {
            Self::Success(value) => Ok(Some(value)),
            Self::Unset => Ok(None),
            Self::Failed(cause) => Err(cause),
        }
    }

    pub fn into_result(self) -> Result<Option<V>, Failure> {
        self.or_rethrow()
    }

    pub fn map<R>(self, f: impl FnOnce(V) -> R) -> Outcome<R> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Unset => Outcome::Unset,
            Self::Failed(cause) => Outcome::Failed(cause),
        }
    }

    pub fn as_ref(&self) -> Outcome<&V> {
        match self {
            Self::Success(value) => Outcome::Success(value),
            Self::Unset => Outcome::Unset,
            Self::Failed(cause) => Outcome::Failed(cause.clone()),
        }
    }
}

impl<V> From<Result<Option<V>, ColdError>> for Outcome<V> {
    fn from(result: Result<Option<V>, ColdError>) -> Self {
        match result {
            Ok(Some(value)) => Self::Success(value),
            Ok(None) => Self::Unset,
            Err(err) => Self::Failed(err.into()),
        }
    }
}

/// Run a fallible operation and capture its result instead of propagating it.
pub fn attempt<V, E>(operation: impl FnOnce() -> Result<V, E>) -> Outcome<V>
where
    E: Into<Failure>,
{
    match operation() {
        Ok(value) => Outcome::Success(value),
        Err(err) => Outcome::Failed(err.into()),
    }
}

/// Like [`attempt`], but discards the cause.
pub fn try_or_none<V, E>(operation: impl FnOnce() -> Result<V, E>) -> Option<V> {
    operation().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn success_with_absent_value_is_present() {
        let outcome: Outcome<Option<i32>> = Outcome::success(None);
        assert!(outcome.is_present());
        assert!(outcome.error().is_none());
        assert_eq!(outcome.or_null(), Some(None));
    }

    #[test]
    fn unset_is_not_present_and_has_no_error() {
        let outcome: Outcome<i32> = Outcome::unset();
        assert!(!outcome.is_present());
        assert!(outcome.is_unset());
        assert!(outcome.error().is_none());
        assert_eq!(outcome.or_else(7), 7);
    }

    #[test]
    fn failed_keeps_its_cause() {
        let cause = Failure::msg("bad input");
        let outcome: Outcome<i32> = Outcome::failed(cause.clone());
        assert!(!outcome.is_present());
        assert!(outcome.error().is_some_and(|e| e.ptr_eq(&cause)));
    }

    #[test]
    fn failed_without_cause_gets_unspecified_cause() {
        let outcome: Outcome<i32> = Outcome::failed(None);
        assert!(outcome.error().is_some_and(Failure::is_unspecified));
    }

    #[test]
    fn fallbacks_ignore_failure() {
        let failed: Outcome<&str> = Outcome::failed(Failure::msg("x"));
        assert_eq!(failed.clone().or_null(), None);
        assert_eq!(failed.clone().or_else("fallback"), "fallback");
        assert_eq!(failed.or_else_get(|| "computed"), "computed");
        assert_eq!(Outcome::success("v").or_else("fallback"), "v");
    }

    #[test]
    fn try_unwrap_chains_original_cause() {
        let err = Outcome::<i32>::failed(Failure::msg("root cause"))
            .try_unwrap()
            .unwrap_err();
        assert!(matches!(err, ColdError::AbsentValue { source: Some(_) }));
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("root cause"));

        let err = Outcome::<i32>::unset().try_unwrap().unwrap_err();
        assert!(matches!(err, ColdError::AbsentValue { source: None }));

        assert_eq!(Outcome::success(3).try_unwrap().unwrap(), 3);
    }

    #[test]
    fn rethrow_propagates_only_failures() {
        let cause = Failure::msg("nope");
        let err = Outcome::<i32>::failed(cause.clone()).or_rethrow().unwrap_err();
        assert!(err.ptr_eq(&cause));

        assert_eq!(Outcome::<i32>::unset().or_rethrow().unwrap(), None);
        assert!(Outcome::success(1).rethrow_failed().unwrap().is_present());
        assert!(Outcome::<i32>::failed(None).rethrow_failed().is_err());
    }

    #[test]
    fn attempt_captures_errors() {
        let ok = attempt(|| Ok::<_, ColdError>(5));
        assert_eq!(ok.or_null(), Some(5));

        let failed = attempt(|| Err::<i32, _>(ColdError::Abandoned));
        assert!(failed.is_failed());
        assert!(failed.error().is_some_and(|f| f.downcast_ref::<ColdError>().is_some()));

        assert_eq!(try_or_none(|| Err::<i32, _>("bad")), None);
    }

    #[test]
    fn map_keeps_state() {
        assert_eq!(Outcome::success(2).map(|v| v * 10).or_null(), Some(20));
        assert!(Outcome::<i32>::unset().map(|v| v * 10).is_unset());
    }
}
