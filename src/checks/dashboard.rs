//! Workflow dashboard: publication status per article version and run.
//!
//! `GET /api/article/{id}` returns
//!
//! ```json
//! {"versions": {"1": {"details": {"publication-status": "ready to publish"},
//!                     "runs": {"1": {"run-id": "...", "first-event-timestamp": 1476294630,
//!                                    "events": [{"event-status": "end", ...}]}}}}}
//! ```

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::{accept_ok, decode_json, trim_host};
use crate::error::{CheckError, TransportError, UnrecoverableFailure};
use crate::http::{BasicAuth, HttpFetch, HttpRequest};
use crate::poll::{PollConfig, PollRequest, PollResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationStatus {
    ReadyToPublish,
    PublicationInProgress,
    Published,
    Error,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::ReadyToPublish => "ready to publish",
            PublicationStatus::PublicationInProgress => "publication in progress",
            PublicationStatus::Published => "published",
            PublicationStatus::Error => "error",
        }
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "ready to publish" => Ok(PublicationStatus::ReadyToPublish),
            "publication in progress" => Ok(PublicationStatus::PublicationInProgress),
            "published" => Ok(PublicationStatus::Published),
            "error" => Ok(PublicationStatus::Error),
            _ => Err(format!(
                "Unknown publication status '{s}'. Expected one of: ready-to-publish, publication-in-progress, published, error"
            )),
        }
    }
}

/// Which run of a version the status must belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSelector {
    Any,
    /// The run whose `run-id` equals this value
    Id(String),
    /// Runs whose first event is strictly after this instant
    After(DateTime<Utc>),
}

/// What the dashboard reported once the expected status was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStatus {
    pub details: Value,
    /// The selected run, unless [`RunSelector::Any`] was used
    pub run: Option<Value>,
}

pub struct DashboardArticleCheck {
    http: Arc<dyn HttpFetch>,
    host: String,
    auth: Option<BasicAuth>,
    poll: PollConfig,
}

impl DashboardArticleCheck {
    pub fn new(http: Arc<dyn HttpFetch>, host: &str, auth: Option<BasicAuth>) -> Self {
        Self {
            http,
            host: trim_host(host),
            auth,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn ready_to_publish(
        &self,
        id: &str,
        version: u32,
        run: RunSelector,
    ) -> Result<DashboardStatus, CheckError> {
        self.status(id, version, PublicationStatus::ReadyToPublish, run)
    }

    pub fn publication_in_progress(&self, id: &str, version: u32) -> Result<DashboardStatus, CheckError> {
        self.status(id, version, PublicationStatus::PublicationInProgress, RunSelector::Any)
    }

    pub fn published(&self, id: &str, version: u32) -> Result<DashboardStatus, CheckError> {
        self.status(id, version, PublicationStatus::Published, RunSelector::Any)
    }

    /// Wait for `versions[version].details.publication-status` to equal
    /// `expected`, on the run picked by `run`.
    ///
    /// No matching run yet is retried; more than one matching run aborts.
    pub fn status(
        &self,
        id: &str,
        version: u32,
        expected: PublicationStatus,
        run: RunSelector,
    ) -> Result<DashboardStatus, CheckError> {
        let url = self.article_url(id);

        let status = PollRequest::new(
            || {
                Ok(match self.fetch_version(&url, version)? {
                    Ok(version_contents) => observe_status(&version_contents, expected, &run),
                    Err(result) => result,
                })
            },
            || format!("{url} version {version} to be '{expected}' ({run:?})"),
        )
        .with_config(&self.poll)
        .run()?;

        info!(id, version, status = %expected, "Dashboard status reached");
        Ok(status)
    }

    /// Wait for the last event of run number `run` to be an error, and
    /// return that event.
    pub fn error(&self, id: &str, version: u32, run: &str) -> Result<Value, CheckError> {
        let url = self.article_url(id);

        let event = PollRequest::new(
            || {
                Ok(match self.fetch_version(&url, version)? {
                    Ok(version_contents) => observe_last_event(&version_contents, run),
                    Err(result) => result,
                })
            },
            || format!("{url} version {version} run {run} to end with an error event"),
        )
        .with_config(&self.poll)
        .run()?;

        info!(id, version, run, "Dashboard reported the error");
        Ok(event)
    }

    fn article_url(&self, id: &str) -> String {
        format!("{}/api/article/{id}", self.host)
    }

    /// The `versions[version]` object, or the poll result to return instead.
    fn fetch_version<T>(
        &self,
        url: &str,
        version: u32,
    ) -> Result<Result<Value, PollResult<T>>, TransportError> {
        let response = self
            .http
            .send(HttpRequest::get(url).basic_auth(self.auth.as_ref()))?;
        let response = match accept_ok(response, "Dashboard", url) {
            Ok(response) => response,
            Err(result) => return Ok(Err(result)),
        };
        let article = match decode_json(&response) {
            Ok(article) => article,
            Err(result) => return Ok(Err(result)),
        };

        match article["versions"].get(version.to_string()) {
            Some(contents) => Ok(Ok(contents.clone())),
            None => Ok(Err(PollResult::not_yet(article))),
        }
    }
}

fn observe_status(
    version_contents: &Value,
    expected: PublicationStatus,
    selector: &RunSelector,
) -> PollResult<DashboardStatus> {
    let run = match selector {
        RunSelector::Any => None,
        selector => match select_run(version_contents, selector) {
            Ok(Some(run)) => Some(run),
            Ok(None) => {
                return PollResult::not_yet(json!({
                    "no_run_matching": format!("{selector:?}"),
                    "version": version_contents,
                }))
            }
            Err(failure) => return PollResult::fatal(failure),
        },
    };

    let details = &version_contents["details"];
    if details["publication-status"].as_str() == Some(expected.as_str()) {
        PollResult::Success(DashboardStatus {
            details: details.clone(),
            run,
        })
    } else {
        PollResult::not_yet(json!({ "details": details, "run": run }))
    }
}

/// The single run matching `selector`; `None` when nothing matches yet.
fn select_run(
    version_contents: &Value,
    selector: &RunSelector,
) -> Result<Option<Value>, UnrecoverableFailure> {
    let runs = match version_contents["runs"].as_object() {
        Some(runs) => runs,
        None => return Ok(None),
    };

    let matching: Vec<&Value> = runs
        .values()
        .filter(|run| match selector {
            RunSelector::Any => true,
            RunSelector::Id(id) => run_id(run).as_deref() == Some(id.as_str()),
            RunSelector::After(after) => {
                first_event_time(run).is_some_and(|started| started > *after)
            }
        })
        .collect();

    match matching.as_slice() {
        [] => Ok(None),
        [run] => Ok(Some((*run).clone())),
        _ => Err(UnrecoverableFailure::from_document(
            format!(
                "{} runs match {selector:?}, cannot tell which one to check",
                matching.len()
            ),
            &Value::Array(matching.into_iter().cloned().collect()),
        )),
    }
}

fn run_id(run: &Value) -> Option<String> {
    match &run["run-id"] {
        Value::Null => None,
        Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}

/// Start of a run; the dashboard reports fractional epoch seconds.
fn first_event_time(run: &Value) -> Option<DateTime<Utc>> {
    let seconds = run["first-event-timestamp"].as_f64()?;
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

fn observe_last_event(version_contents: &Value, run: &str) -> PollResult<Value> {
    let events = &version_contents["runs"][run]["events"];
    match events.as_array().and_then(|events| events.last()) {
        Some(event) if event["event-status"] == "error" => PollResult::Success(event.clone()),
        Some(event) => PollResult::not_yet(event.clone()),
        None => PollResult::not_yet(json!({ "runs": version_contents["runs"] })),
    }
}
