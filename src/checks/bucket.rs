//! Object-store presence checks.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::article::KeyParams;
use crate::error::{CheckError, TransportError, UnrecoverableFailure};
use crate::poll::{PollConfig, PollRequest, PollResult};
use crate::storage::ObjectStore;

/// Keys listed in a not-yet diagnostic at most
const MAX_STALE_KEYS: usize = 20;

/// A key that matched, with the pattern's named captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketMatch {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub captures: BTreeMap<String, String>,
}

impl BucketMatch {
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }
}

/// Waits for an object whose key matches a template to show up in a bucket.
pub struct BucketFileCheck {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    pattern: String,
    prefix: Option<String>,
    poll: PollConfig,
}

impl BucketFileCheck {
    /// `pattern` is a regex template with `{name}` placeholders.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            pattern: pattern.into(),
            prefix: None,
            poll: PollConfig::default(),
        }
    }

    /// Narrow listings to keys starting with this literal template.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    /// Wait for a key matching the pattern filled with `params`.
    ///
    /// With `last_modified_after`, only objects modified strictly later count;
    /// older matches are leftovers of a previous run.
    pub fn of(
        &self,
        params: &KeyParams,
        last_modified_after: Option<DateTime<Utc>>,
    ) -> Result<BucketMatch, CheckError> {
        let criteria = params.fill_pattern(&self.pattern);
        let regex = Regex::new(&format!("^(?:{criteria})")).map_err(|e| {
            UnrecoverableFailure::new(format!("Invalid key pattern for bucket {}", self.bucket))
                .with_detail(e.to_string())
        })?;
        let prefix = self.prefix.as_ref().map(|p| params.fill_literal(p));

        let found = PollRequest::new(
            || self.observe(&regex, prefix.as_deref(), last_modified_after),
            || {
                let mut description = format!("{} in bucket {}", criteria, self.bucket);
                if let Some(after) = last_modified_after {
                    description.push_str(&format!(" modified after {}", after.to_rfc3339()));
                }
                description
            },
        )
        .with_config(&self.poll)
        .run()?;

        info!(bucket = %self.bucket, key = %found.key, "Found object");
        Ok(found)
    }

    fn observe(
        &self,
        regex: &Regex,
        prefix: Option<&str>,
        last_modified_after: Option<DateTime<Utc>>,
    ) -> Result<PollResult<BucketMatch>, TransportError> {
        let objects = self.store.list(&self.bucket, prefix)?;
        let mut stale = Vec::new();

        for object in &objects {
            let Some(captures) = regex.captures(&object.key) else {
                continue;
            };
            if last_modified_after.is_some_and(|after| object.last_modified <= after) {
                stale.push(json!({
                    "key": object.key,
                    "last_modified": object.last_modified.to_rfc3339(),
                }));
                continue;
            }

            let named = regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect();

            return Ok(PollResult::Success(BucketMatch {
                key: object.key.clone(),
                last_modified: object.last_modified,
                captures: named,
            }));
        }

        stale.truncate(MAX_STALE_KEYS);
        Ok(PollResult::not_yet(json!({
            "bucket": self.bucket,
            "prefix": prefix,
            "listed": objects.len(),
            "stale_matches": stale,
        })))
    }
}
