//! Outcome of a single observation

use serde_json::Value;

use crate::error::UnrecoverableFailure;

/// What one observation of a backend concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult<T> {
    /// The awaited condition holds
    Success(T),
    /// Not there yet; the snapshot is kept for the timeout report only
    NotYet(Option<Value>),
    /// Waiting will never help
    Fatal(UnrecoverableFailure),
}

impl<T> PollResult<T> {
    /// Not yet, with a snapshot of what the backend returned
    pub fn not_yet(diagnostic: impl Into<Value>) -> Self {
        PollResult::NotYet(Some(diagnostic.into()))
    }

    /// Not yet, with nothing worth reporting
    pub fn pending() -> Self {
        PollResult::NotYet(None)
    }

    pub fn fatal(failure: UnrecoverableFailure) -> Self {
        PollResult::Fatal(failure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PollResult::Success(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PollResult<U> {
        match self {
            PollResult::Success(value) => PollResult::Success(f(value)),
            PollResult::NotYet(diagnostic) => PollResult::NotYet(diagnostic),
            PollResult::Fatal(failure) => PollResult::Fatal(failure),
        }
    }
}
