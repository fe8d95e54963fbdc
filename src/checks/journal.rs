//! Rendered journal pages.

use std::sync::Arc;
use tracing::info;

use super::{accept_ok, trim_host, ResourceLoader};
use crate::error::{CheckError, UnrecoverableFailure};
use crate::http::HttpFetch;
use crate::poll::{PollConfig, PollRequest, PollResult};

pub const HOMEPAGE_PATH: &str = "/";
pub const MAGAZINE_PATH: &str = "/magazine";

pub struct JournalCheck {
    http: Arc<dyn HttpFetch>,
    host: String,
    resources: ResourceLoader,
    poll: PollConfig,
}

impl JournalCheck {
    pub fn new(http: Arc<dyn HttpFetch>, host: &str, resources: ResourceLoader) -> Self {
        Self {
            http,
            host: trim_host(host),
            resources,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn resources(&self) -> &ResourceLoader {
        &self.resources
    }

    pub fn homepage(&self) -> Result<String, CheckError> {
        self.generic(HOMEPAGE_PATH)
    }

    pub fn magazine(&self) -> Result<String, CheckError> {
        self.generic(MAGAZINE_PATH)
    }

    /// Load a page that must already exist, with all its resources.
    pub fn generic(&self, path: &str) -> Result<String, CheckError> {
        let url = format!("{}{path}", self.host);
        let body = self.load_once(&url)?;
        info!(%url, "Page loaded");
        Ok(body)
    }

    /// Wait for an article page to render, then load its resources and, when
    /// the article has figures, its figures page. Returns the article page.
    pub fn article(
        &self,
        id: &str,
        volume: u64,
        version: Option<u32>,
        has_figures: bool,
    ) -> Result<String, CheckError> {
        let mut url = format!("{}/content/{volume}/e{id}", self.host);
        if let Some(version) = version {
            url.push_str(&format!("v{version}"));
        }

        let body = PollRequest::new(
            || {
                let response = self.http.get(&url)?;
                Ok(match accept_ok(response, "Journal", &url) {
                    Ok(response) => PollResult::Success(response.body),
                    Err(result) => result,
                })
            },
            || format!("{url} to render"),
        )
        .with_config(&self.poll)
        .run()?;
        self.resources.verify_page(&body, &self.host)?;

        if has_figures {
            self.load_once(&format!("{url}/figures"))?;
        }

        info!(id, volume, "Article page loaded");
        Ok(body)
    }

    fn load_once(&self, url: &str) -> Result<String, CheckError> {
        let response = self.http.get(url).map_err(UnrecoverableFailure::from)?;
        if !response.is_ok() {
            return Err(UnrecoverableFailure::from_response(
                format!("Journal did not serve {url}"),
                response.status,
                &response.body,
            )
            .into());
        }

        self.resources.verify_page(&response.body, &self.host)?;
        Ok(response.body)
    }
}
