//! Failure types shared by the poll engine and every backend check.
//!
//! A check call has exactly two ways to fail:
//! - [`TimeoutFailure`]: the awaited condition was still "not yet" when the
//!   deadline passed. Carries the last snapshot observed from the backend.
//! - [`UnrecoverableFailure`]: the backend said something that waiting will
//!   never fix (server error, identity mismatch, ambiguous match).
//!
//! [`TransportError`] is the lower-level taxonomy produced by the HTTP and
//! object-store seams; the poll engine decides which of its variants are
//! retried.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of characters of a backend response kept in an error.
pub const MAX_DETAIL_LENGTH: usize = 2000;

/// A retryable condition that did not resolve before the timeout.
#[derive(Debug, Clone)]
pub struct TimeoutFailure {
    /// What was being awaited
    pub description: String,
    /// Snapshot from the most recent observation, if any was produced
    pub last_seen: Option<Value>,
    /// Number of observation attempts made
    pub attempts: u32,
    /// Wall-clock time spent polling
    pub elapsed: Duration,
    /// When the engine gave up
    pub gave_up_at: DateTime<Utc>,
}

impl fmt::Display for TimeoutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timed out waiting for {} ({} attempts in {:.1}s, gave up at {})",
            self.description,
            self.attempts,
            self.elapsed.as_secs_f64(),
            self.gave_up_at.to_rfc3339()
        )?;
        match &self.last_seen {
            Some(value) => write!(f, "\nLast seen:\n{}", pretty(value)),
            None => write!(f, "\nLast seen: nothing"),
        }
    }
}

impl std::error::Error for TimeoutFailure {}

/// A backend condition known to never self-resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrecoverableFailure {
    pub reason: String,
    /// The offending response or detail, kept verbatim (truncated)
    pub detail: Option<String>,
}

impl UnrecoverableFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(truncate_detail(&detail.into(), MAX_DETAIL_LENGTH));
        self
    }

    /// Failure caused by an HTTP response, keeping status and body.
    pub fn from_response(reason: impl Into<String>, status: u16, body: &str) -> Self {
        Self::new(reason).with_detail(format!("HTTP {status}: {body}"))
    }

    /// Failure caused by a JSON document that contradicts the request.
    pub fn from_document(reason: impl Into<String>, document: &Value) -> Self {
        Self::new(reason).with_detail(pretty(document))
    }
}

impl fmt::Display for UnrecoverableFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n{detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnrecoverableFailure {}

/// The failure channel of every check call.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Timeout(#[from] TimeoutFailure),

    #[error(transparent)]
    Unrecoverable(#[from] UnrecoverableFailure),
}

impl CheckError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CheckError::Timeout(_))
    }

    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, CheckError::Unrecoverable(_))
    }

    /// Last backend snapshot seen before a timeout.
    pub fn last_seen(&self) -> Option<&Value> {
        match self {
            CheckError::Timeout(failure) => failure.last_seen.as_ref(),
            CheckError::Unrecoverable(_) => None,
        }
    }
}

/// Errors raised while talking to a backend, before any response
/// interpretation happens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("TLS failure: {0}")]
    Tls(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Response exceeds maximum allowed size of {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("Unexpected HTTP {code}: {body}")]
    Status { code: u16, body: String },
}

impl TransportError {
    /// Whether waiting and trying again can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Connection(_)
                | TransportError::Tls(_)
                | TransportError::Timeout(_)
                | TransportError::Body(_)
        )
    }
}

impl From<TransportError> for UnrecoverableFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { code, body } => {
                UnrecoverableFailure::from_response("Backend rejected the request", code, &body)
            }
            other => UnrecoverableFailure::new(other.to_string()),
        }
    }
}

pub(crate) fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Truncate to at most `max_chars` characters, marking the cut.
pub(crate) fn truncate_detail(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &s[..index]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timeout_message_includes_last_seen() {
        let failure = TimeoutFailure {
            description: "article 15893 v1 to be published".to_string(),
            last_seen: Some(json!({"publish": false})),
            attempts: 3,
            elapsed: Duration::from_millis(1500),
            gave_up_at: Utc::now(),
        };

        let message = failure.to_string();
        assert!(message.contains("article 15893 v1 to be published"));
        assert!(message.contains("3 attempts"));
        assert!(message.contains("\"publish\": false"));
    }

    #[test]
    fn test_timeout_message_without_snapshot() {
        let failure = TimeoutFailure {
            description: "anything".to_string(),
            last_seen: None,
            attempts: 1,
            elapsed: Duration::ZERO,
            gave_up_at: Utc::now(),
        };
        assert!(failure.to_string().ends_with("Last seen: nothing"));
    }

    #[test]
    fn test_unrecoverable_from_response() {
        let failure = UnrecoverableFailure::from_response("Dashboard error", 502, "Bad Gateway");
        assert_eq!(failure.reason, "Dashboard error");
        assert_eq!(failure.detail.as_deref(), Some("HTTP 502: Bad Gateway"));
        assert_eq!(failure.to_string(), "Dashboard error\nHTTP 502: Bad Gateway");
    }

    #[test]
    fn test_check_error_accessors() {
        let err: CheckError = UnrecoverableFailure::new("boom").into();
        assert!(err.is_unrecoverable());
        assert!(!err.is_timeout());
        assert!(err.last_seen().is_none());
    }

    #[test]
    fn test_transport_error_transience() {
        assert!(TransportError::Connection("refused".into()).is_transient());
        assert!(TransportError::Tls("handshake".into()).is_transient());
        assert!(TransportError::Timeout("slow".into()).is_transient());
        assert!(!TransportError::InvalidRequest("bad url".into()).is_transient());
        assert!(!TransportError::Status {
            code: 403,
            body: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_status_error_converts_with_body() {
        let failure: UnrecoverableFailure = TransportError::Status {
            code: 403,
            body: "AccessDenied".to_string(),
        }
        .into();
        assert_eq!(failure.detail.as_deref(), Some("HTTP 403: AccessDenied"));
    }

    #[test]
    fn test_truncate_detail_respects_char_boundaries() {
        assert_eq!(truncate_detail("short", 10), "short");
        assert_eq!(truncate_detail("ŁęskiŁęski", 5), "Łęski...");
    }
}
