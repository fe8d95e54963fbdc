//! Article store (LAX) version listing.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{accept_ok, decode_json, trim_host};
use crate::article::DOI_PREFIX;
use crate::error::{CheckError, TransportError};
use crate::http::{HttpFetch, HttpRequest};
use crate::poll::{PollConfig, PollRequest, PollResult};

pub struct LaxArticleCheck {
    http: Arc<dyn HttpFetch>,
    host: String,
    poll: PollConfig,
}

impl LaxArticleCheck {
    pub fn new(http: Arc<dyn HttpFetch>, host: &str) -> Self {
        Self {
            http,
            host: trim_host(host),
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Wait for `version` to be listed as published, returning its entry
    /// (`volume`, `manuscript_id`, `version`, ...).
    pub fn published(&self, id: &str, version: u32) -> Result<Value, CheckError> {
        let url = format!("{}/api/v1/article/{DOI_PREFIX}.{id}/version", self.host);

        let entry = PollRequest::new(
            || self.observe(&url, version),
            || format!("{url} to list version {version} as published"),
        )
        .with_config(&self.poll)
        .run()?;

        info!(id, version, "Version is published in LAX");
        Ok(entry)
    }

    fn observe(&self, url: &str, version: u32) -> Result<PollResult<Value>, TransportError> {
        let response = match accept_ok(self.http.send(HttpRequest::get(url))?, "LAX", url) {
            Ok(response) => response,
            Err(result) => return Ok(result),
        };
        let versions = match decode_json(&response) {
            Ok(versions) => versions,
            Err(result) => return Ok(result),
        };

        let entry = match versions.get(version.to_string()) {
            Some(entry) => entry,
            None => return Ok(PollResult::not_yet(json!({ "versions": versions }))),
        };

        match entry.get("status").and_then(Value::as_str) {
            None | Some("published") => Ok(PollResult::Success(entry.clone())),
            Some(_) => Ok(PollResult::not_yet(entry.clone())),
        }
    }
}
