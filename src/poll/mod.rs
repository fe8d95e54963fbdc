//! Poll primitive
//!
//! Repeatedly observes a backend until the awaited condition holds, the
//! timeout elapses, or the backend signals something that waiting will never
//! fix.
//!
//! # Retry policy
//!
//! - `Success` returns immediately.
//! - `NotYet` is retried after a constant `interval`; its snapshot replaces the
//!   previous one and is only used to report a timeout.
//! - Transient transport errors (connection, TLS, request timeout) count as
//!   "not yet" and are logged at debug level.
//! - `Fatal` results and non-transient transport errors abort at once.
//!
//! At least one observation is always made. The last sleep is clipped to the
//! time left, so one final observation happens at the deadline and the call
//! never takes longer than `timeout + interval`.

mod config;
mod result;


use chrono::Utc;
use serde_json::json;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{CheckError, TimeoutFailure, TransportError, UnrecoverableFailure};

pub use config::{PollConfig, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
pub use result::PollResult;

/// One polling invocation: what to observe, for how long, and how to describe
/// it if it never happens.
///
/// `describe` is only evaluated on the timeout path.
pub struct PollRequest<F, D> {
    observe: F,
    describe: D,
    timeout: Duration,
    interval: Duration,
}

impl<F, D> PollRequest<F, D> {
    pub fn new(observe: F, describe: D) -> Self {
        Self {
            observe,
            describe,
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_config(self, config: &PollConfig) -> Self {
        self.timeout(config.timeout).interval(config.interval)
    }

    /// Observe until success, timeout, or a fatal condition.
    pub fn run<T>(self) -> Result<T, CheckError>
    where
        F: FnMut() -> Result<PollResult<T>, TransportError>,
        D: FnOnce() -> String,
    {
        let PollRequest {
            mut observe,
            describe,
            timeout,
            interval,
        } = self;

        let start = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_seen = None;

        loop {
            attempts += 1;

            match observe() {
                Ok(PollResult::Success(value)) => {
                    debug!(attempts, elapsed_ms = start.elapsed().as_millis() as u64, "Condition met");
                    return Ok(value);
                }
                Ok(PollResult::NotYet(diagnostic)) => {
                    last_seen = diagnostic;
                }
                Ok(PollResult::Fatal(failure)) => {
                    warn!(attempts, reason = %failure.reason, "Unrecoverable condition, aborting poll");
                    return Err(failure.into());
                }
                Err(err) if err.is_transient() => {
                    debug!(attempts, error = %err, "Transient backend error, will retry");
                    last_seen = Some(json!({ "transport_error": err.to_string() }));
                }
                Err(err) => {
                    warn!(attempts, error = %err, "Backend error is not retryable, aborting poll");
                    return Err(UnrecoverableFailure::from(err).into());
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(TimeoutFailure {
                    description: describe(),
                    last_seen,
                    attempts,
                    elapsed,
                    gave_up_at: Utc::now(),
                }
                .into());
            }

            thread::sleep(interval.min(timeout - elapsed));
        }
    }
}

/// Poll `observe` every `interval` until it succeeds or `timeout` elapses.
///
/// See [`PollRequest`] for the builder form used by the backend checks.
pub fn poll<T, F, D>(
    observe: F,
    timeout: Duration,
    interval: Duration,
    describe: D,
) -> Result<T, CheckError>
where
    F: FnMut() -> Result<PollResult<T>, TransportError>,
    D: FnOnce() -> String,
{
    PollRequest::new(observe, describe)
        .timeout(timeout)
        .interval(interval)
        .run()
}
