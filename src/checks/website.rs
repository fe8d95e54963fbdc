//! Publication state as seen by the website.

use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{accept_ok, decode_json, trim_host};
use crate::error::{CheckError, TransportError, UnrecoverableFailure};
use crate::http::{BasicAuth, HttpFetch, HttpRequest, HttpResponse};
use crate::poll::{PollConfig, PollRequest, PollResult};

pub struct WebsiteArticleCheck {
    http: Arc<dyn HttpFetch>,
    host: String,
    auth: Option<BasicAuth>,
    poll: PollConfig,
}

impl WebsiteArticleCheck {
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

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Wait until the website knows the version but keeps it unpublished.
    pub fn unpublished(&self, id: &str, version: u32) -> Result<Value, CheckError> {
        self.article(id, version, false)
    }

    pub fn published(&self, id: &str, version: u32) -> Result<Value, CheckError> {
        self.article(id, version, true)
    }

    /// Wait until `path` renders with a 200.
    pub fn visible(&self, path: &str) -> Result<String, CheckError> {
        let url = format!("{}{path}", self.host);

        let body = PollRequest::new(
            || {
                let response = self.fetch(&url)?;
                Ok(match accept_ok(response, "Website", &url) {
                    Ok(response) => PollResult::Success(response.body),
                    Err(result) => result,
                })
            },
            || format!("{url} to be visible"),
        )
        .with_config(&self.poll)
        .run()?;

        info!(%url, "Page is visible");
        Ok(body)
    }

    fn article(&self, id: &str, version: u32, publish: bool) -> Result<Value, CheckError> {
        let url = format!("{}/api/article/{id}.{version}.json", self.host);

        let article = PollRequest::new(
            || self.observe_article(&url, id, publish),
            || format!("{url} to have publish={publish}"),
        )
        .with_config(&self.poll)
        .run()?;

        info!(id, version, publish, "Website article state reached");
        Ok(article)
    }

    fn observe_article(
        &self,
        url: &str,
        id: &str,
        publish: bool,
    ) -> Result<PollResult<Value>, TransportError> {
        let response = match accept_ok(self.fetch(url)?, "Website", url) {
            Ok(response) => response,
            Err(result) => return Ok(result),
        };
        let body = match decode_json(&response) {
            Ok(body) => body,
            Err(result) => return Ok(result),
        };

        if body["article-id"].as_str() != Some(id) {
            return Ok(PollResult::fatal(UnrecoverableFailure::from_document(
                format!("Website returned a different article for {url} (expected {id})"),
                &body,
            )));
        }

        if body["publish"].as_bool() == Some(publish) {
            Ok(PollResult::Success(body))
        } else {
            Ok(PollResult::not_yet(body))
        }
    }

    fn fetch(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.http
            .send(HttpRequest::get(url).basic_auth(self.auth.as_ref()))
    }
}
