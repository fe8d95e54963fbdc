//! Raw article XML in the source repository.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{accept_ok, trim_host};
use crate::error::{CheckError, TransportError};
use crate::http::{HttpFetch, HttpRequest};
use crate::poll::{PollConfig, PollRequest, PollResult};

pub struct GithubCheck {
    http: Arc<dyn HttpFetch>,
    repo_base: String,
    poll: PollConfig,
}

impl GithubCheck {
    pub fn new(http: Arc<dyn HttpFetch>, repo_base: &str) -> Self {
        Self {
            http,
            repo_base: trim_host(repo_base),
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Wait for the article XML to be pushed; with `text_match`, wait for
    /// that exact text to appear in it.
    pub fn article(
        &self,
        id: &str,
        version: u32,
        text_match: Option<&str>,
    ) -> Result<String, CheckError> {
        let url = format!("{}/articles/elife-{id}-v{version}.xml", self.repo_base);

        let body = PollRequest::new(
            || self.observe(&url, text_match),
            || match text_match {
                Some(text) => format!("{url} to contain '{text}'"),
                None => format!("{url} to exist"),
            },
        )
        .with_config(&self.poll)
        .run()?;

        info!(id, version, "Article XML is in the repository");
        Ok(body)
    }

    fn observe(&self, url: &str, text_match: Option<&str>) -> Result<PollResult<String>, TransportError> {
        let response = match accept_ok(self.http.send(HttpRequest::get(url))?, "Repository", url) {
            Ok(response) => response,
            Err(result) => return Ok(result),
        };

        match text_match {
            Some(text) if !response.body.contains(text) => Ok(PollResult::not_yet(json!({
                "status": response.status,
                "missing_text": text,
                "length": response.body.len(),
            }))),
            _ => Ok(PollResult::Success(response.body)),
        }
    }
}
