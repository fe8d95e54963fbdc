//! Public API checks.
//!
//! List endpoints and search are fetched once and asserted on; article and
//! search-result checks poll.

use reqwest::Url;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use super::{accept_ok, decode_json, trim_host};
use crate::error::{CheckError, TransportError, UnrecoverableFailure};
use crate::http::{HttpFetch, HttpRequest};
use crate::poll::{PollConfig, PollRequest, PollResult};

pub const LIST_ENDPOINTS: &[&str] = &[
    "labs-experiments",
    "subjects",
    "podcast-episodes",
    "people",
    "blog-articles",
    "events",
    "interviews",
    "collections",
    "medium-articles",
];

pub struct ApiCheck {
    http: Arc<dyn HttpFetch>,
    host: String,
    poll: PollConfig,
}

impl ApiCheck {
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

    pub fn labs_experiments(&self) -> Result<Value, CheckError> {
        self.list("labs-experiments")
    }

    pub fn subjects(&self) -> Result<Value, CheckError> {
        self.list("subjects")
    }

    pub fn podcast_episodes(&self) -> Result<Value, CheckError> {
        self.list("podcast-episodes")
    }

    pub fn people(&self) -> Result<Value, CheckError> {
        self.list("people")
    }

    pub fn blog_articles(&self) -> Result<Value, CheckError> {
        self.list("blog-articles")
    }

    pub fn events(&self) -> Result<Value, CheckError> {
        self.list("events")
    }

    pub fn interviews(&self) -> Result<Value, CheckError> {
        self.list("interviews")
    }

    pub fn collections(&self) -> Result<Value, CheckError> {
        self.list("collections")
    }

    pub fn medium_articles(&self) -> Result<Value, CheckError> {
        self.list("medium-articles")
    }

    /// Fetch a list endpoint once and require at least one item.
    pub fn list(&self, endpoint: &str) -> Result<Value, CheckError> {
        let url = format!("{}/{}", self.host, endpoint.trim_start_matches('/'));
        let body = self.fetch_once(&url)?;

        match body["total"].as_u64() {
            Some(total) if total >= 1 => {
                info!(endpoint, total, "List endpoint has content");
                Ok(body)
            }
            _ => Err(UnrecoverableFailure::from_document(
                format!("{url} should list at least one item"),
                &body,
            )
            .into()),
        }
    }

    /// Wait for a version of an article to be served, and require the API to
    /// echo that exact version.
    pub fn article(&self, id: &str, version: u32) -> Result<Value, CheckError> {
        let url = format!("{}/articles/{id}/versions/{version}", self.host);

        let article = PollRequest::new(
            || {
                let body = match self.fetch_json(&url)? {
                    Ok(body) => body,
                    Err(result) => return Ok(result),
                };
                if body["version"].as_u64() == Some(u64::from(version)) {
                    Ok(PollResult::Success(body))
                } else {
                    Ok(PollResult::fatal(UnrecoverableFailure::from_document(
                        format!("{url} returned a different version than {version}"),
                        &body,
                    )))
                }
            },
            || format!("{url} to be available"),
        )
        .with_config(&self.poll)
        .run()?;

        info!(id, version, "Article is served by the API");
        Ok(article)
    }

    /// Wait until every field in `constraints` has the expected value in the
    /// latest version of the article. Mismatches are only ever "not yet".
    pub fn wait_article(&self, id: &str, constraints: &Map<String, Value>) -> Result<Value, CheckError> {
        let url = format!("{}/articles/{id}", self.host);

        let article = PollRequest::new(
            || {
                let body = match self.fetch_json(&url)? {
                    Ok(body) => body,
                    Err(result) => return Ok(result),
                };
                let mismatched: Map<String, Value> = constraints
                    .iter()
                    .filter(|(field, expected)| body.get(field.as_str()) != Some(*expected))
                    .map(|(field, expected)| {
                        (
                            field.clone(),
                            json!({ "expected": expected, "actual": body.get(field.as_str()) }),
                        )
                    })
                    .collect();

                if mismatched.is_empty() {
                    Ok(PollResult::Success(body))
                } else {
                    Ok(PollResult::not_yet(json!({ "mismatched": mismatched })))
                }
            },
            || format!("{url} to match {}", Value::Object(constraints.clone())),
        )
        .with_config(&self.poll)
        .run()?;

        info!(id, "Article matches the expected fields");
        Ok(article)
    }

    /// Search once and return the result page as is.
    pub fn search(&self, term: &str) -> Result<Value, CheckError> {
        let url = self.search_url(term)?;
        self.fetch_once(&url)
    }

    /// Wait until searching for `term` returns at least one item.
    pub fn wait_search(&self, term: &str) -> Result<Value, CheckError> {
        let url = self.search_url(term)?;
        self.wait_for_items(&url)
    }

    /// Wait until the article has at least one recommendation.
    pub fn wait_recommendations(&self, id: &str) -> Result<Value, CheckError> {
        let url = format!("{}/recommendations/article/{id}", self.host);
        self.wait_for_items(&url)
    }

    fn wait_for_items(&self, url: &str) -> Result<Value, CheckError> {
        let body = PollRequest::new(
            || {
                let body = match self.fetch_json(url)? {
                    Ok(body) => body,
                    Err(result) => return Ok(result),
                };
                let has_items = body["items"].as_array().is_some_and(|items| !items.is_empty());
                if has_items {
                    Ok(PollResult::Success(body))
                } else {
                    Ok(PollResult::not_yet(body))
                }
            },
            || format!("{url} to return at least one item"),
        )
        .with_config(&self.poll)
        .run()?;

        info!(%url, "Results are available");
        Ok(body)
    }

    fn search_url(&self, term: &str) -> Result<String, UnrecoverableFailure> {
        Url::parse_with_params(&format!("{}/search", self.host), &[("for", term)])
            .map(String::from)
            .map_err(|e| {
                UnrecoverableFailure::new(format!("Invalid API host {}", self.host))
                    .with_detail(e.to_string())
            })
    }

    /// GET and decode, or the poll result to return instead.
    fn fetch_json<T>(&self, url: &str) -> Result<Result<Value, PollResult<T>>, TransportError> {
        let response = match accept_ok(self.http.send(HttpRequest::get(url))?, "API", url) {
            Ok(response) => response,
            Err(result) => return Ok(Err(result)),
        };
        Ok(decode_json(&response))
    }

    fn fetch_once(&self, url: &str) -> Result<Value, CheckError> {
        let response = self
            .http
            .send(HttpRequest::get(url))
            .map_err(UnrecoverableFailure::from)?;
        if !response.is_ok() {
            return Err(UnrecoverableFailure::from_response(
                format!("API did not serve {url}"),
                response.status,
                &response.body,
            )
            .into());
        }

        response.json().map_err(|e| {
            UnrecoverableFailure::new(format!("API returned invalid JSON for {url}"))
                .with_detail(e.to_string())
                .into()
        })
    }
}
