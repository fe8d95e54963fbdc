//! Page-load verification: every sub-resource of a page must load.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::html::resource_urls;
use crate::error::{CheckError, UnrecoverableFailure};
use crate::http::HttpFetch;

/// Last observed status per absolute resource URL, shared by every page
/// checked in this process.
///
/// Two threads may probe the same URL concurrently; the second write wins.
#[derive(Debug, Default)]
pub struct ResourceCache {
    statuses: DashMap<String, u16>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<u16> {
        self.statuses.get(url).map(|status| *status)
    }

    pub fn record(&self, url: &str, status: u16) {
        self.statuses.insert(url.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

pub struct ResourceLoader {
    http: Arc<dyn HttpFetch>,
    cache: Arc<ResourceCache>,
}

impl ResourceLoader {
    pub fn new(http: Arc<dyn HttpFetch>, cache: Arc<ResourceCache>) -> Self {
        Self { http, cache }
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// Probe every resource referenced by `html` that was not verified yet.
    /// Returns the number of probes made.
    ///
    /// A missing asset on a rendered page is a defect, so the first failure
    /// aborts without retrying.
    pub fn verify_page(&self, html: &str, origin: &str) -> Result<usize, CheckError> {
        let urls = resource_urls(html, origin);
        let mut probed = 0;

        for url in &urls {
            let status = match self.cache.get(url) {
                Some(status) => status,
                None => {
                    probed += 1;
                    let response = self.http.head(url).map_err(|e| {
                        warn!(%url, error = %e, "Resource could not be loaded");
                        UnrecoverableFailure::new(format!("Resource could not be loaded: {url}"))
                            .with_detail(e.to_string())
                    })?;
                    self.cache.record(url, response.status);
                    response.status
                }
            };

            if status != 200 {
                warn!(%url, status, "Resource failed to load");
                return Err(UnrecoverableFailure::new(format!(
                    "Resource failed to load: {url} (HTTP {status})"
                ))
                .into());
            }
        }

        debug!(resources = urls.len(), probed, "Page resources verified");
        Ok(probed)
    }
}
