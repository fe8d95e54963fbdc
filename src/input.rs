//! Single-shot operations that feed the pipeline.
//!
//! These mutate backends, so they are never retried.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::article::Article;
use crate::config::Settings;
use crate::error::truncate_detail;
use crate::http::{BasicAuth, HttpFetch, HttpRequest};
use crate::storage::ObjectStore;

const ERROR_BODY_LENGTH: usize = 500;

/// Every input operation of one environment.
pub struct Inputs {
    pub dashboard: DashboardPublisher,
    pub production_bucket: InputBucket,
    pub silent_correction_bucket: InputBucket,
    pub silent_correction: SilentCorrectionStarter,
}

impl Inputs {
    pub fn from_settings(
        settings: &Settings,
        http: Arc<dyn HttpFetch>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            dashboard: DashboardPublisher::new(
                http.clone(),
                &settings.dashboard.host,
                settings.dashboard.auth.clone(),
            ),
            production_bucket: InputBucket::new(store.clone(), &settings.buckets.input),
            silent_correction_bucket: InputBucket::new(store, &settings.buckets.silent_correction),
            silent_correction: SilentCorrectionStarter::new(
                http,
                &settings.silent_correction.host,
                &settings.buckets.silent_correction,
                settings.silent_correction.auth.clone(),
            ),
        }
    }
}

/// Triggers publication of a run through the dashboard.
pub struct DashboardPublisher {
    http: Arc<dyn HttpFetch>,
    host: String,
    auth: Option<BasicAuth>,
}

impl DashboardPublisher {
    pub fn new(http: Arc<dyn HttpFetch>, host: &str, auth: Option<BasicAuth>) -> Self {
        Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn publish(&self, article: &Article, run: &str) -> Result<()> {
        let url = format!("{}/api/queue_article_publication", self.host);
        let body = json!({
            "articles": [{
                "id": article.id(),
                "version": article.version(),
                "run": run,
            }]
        });

        let response = self
            .http
            .send(HttpRequest::post_json(&url, &body).basic_auth(self.auth.as_ref()))
            .with_context(|| format!("Failed to reach dashboard at {url}"))?;

        if !response.is_ok() {
            bail!(
                "Dashboard refused to publish {} v{} run {run}: HTTP {}: {}",
                article.id(),
                article.version(),
                response.status,
                truncate_detail(&response.body, ERROR_BODY_LENGTH)
            );
        }

        info!(id = article.id(), version = article.version(), run, "Publication queued");
        Ok(())
    }
}

/// Starts the silent correction of a package already in the silent
/// correction bucket. The corrected article keeps its version.
pub struct SilentCorrectionStarter {
    http: Arc<dyn HttpFetch>,
    host: String,
    bucket: String,
    auth: Option<BasicAuth>,
}

impl SilentCorrectionStarter {
    pub fn new(
        http: Arc<dyn HttpFetch>,
        host: &str,
        bucket: impl Into<String>,
        auth: Option<BasicAuth>,
    ) -> Self {
        Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            auth,
        }
    }

    pub fn article(&self, filename: &str) -> Result<()> {
        let url = format!("{}/api/silent_correction", self.host);
        let body = json!({ "bucket": self.bucket, "filename": filename });

        let response = self
            .http
            .send(HttpRequest::post_json(&url, &body).basic_auth(self.auth.as_ref()))
            .with_context(|| format!("Failed to reach silent correction starter at {url}"))?;

        if !response.is_ok() {
            bail!(
                "Silent correction of {filename} was refused: HTTP {}: {}",
                response.status,
                truncate_detail(&response.body, ERROR_BODY_LENGTH)
            );
        }

        info!(bucket = %self.bucket, filename, "Silent correction started");
        Ok(())
    }
}

/// A bucket whose uploads start a workflow.
pub struct InputBucket {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl InputBucket {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Upload a package under its file name; returns the key.
    pub fn upload(&self, path: &Path) -> Result<String> {
        let key = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Package path has no file name: {}", path.display()))?
            .to_string();
        let body = fs::read(path)
            .with_context(|| format!("Failed to read package: {}", path.display()))?;

        self.store
            .put(&self.bucket, &key, body)
            .with_context(|| format!("Failed to upload {key} to bucket {}", self.bucket))?;

        info!(bucket = %self.bucket, %key, "Uploaded package");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryObjectStore, ScriptedHttp};
    use crate::http::Method;
    use tempfile::TempDir;

    const QUEUE_URL: &str = "https://dashboard.example.org/api/queue_article_publication";
    const SILENT_CORRECTION_URL: &str = "https://workflows.example.org/api/silent_correction";

    #[test]
    fn test_publish_posts_run() {
        let http = Arc::new(ScriptedHttp::new());
        http.respond(Method::Post, QUEUE_URL, 200, "{}");

        DashboardPublisher::new(http.clone(), "https://dashboard.example.org", None)
            .publish(&Article::new("15893", 1), "run7")
            .unwrap();

        let request = &http.requests()[0];
        let sent: serde_json::Value =
            serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            sent,
            json!({"articles": [{"id": "15893", "version": 1, "run": "run7"}]})
        );
    }

    #[test]
    fn test_publish_refusal_is_an_error() {
        let http = Arc::new(ScriptedHttp::new());
        http.respond(Method::Post, QUEUE_URL, 400, "unknown run");

        let err = DashboardPublisher::new(http, "https://dashboard.example.org/", None)
            .publish(&Article::new("15893", 1), "run7")
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 400: unknown run"));
    }

    #[test]
    fn test_silent_correction_names_bucket_and_file() {
        let http = Arc::new(ScriptedHttp::new());
        http.respond(Method::Post, SILENT_CORRECTION_URL, 200, "{}");

        SilentCorrectionStarter::new(
            http.clone(),
            "https://workflows.example.org/",
            "silent-corrections",
            None,
        )
        .article("elife-15893-vor-r1.zip")
        .unwrap();

        let request = &http.requests()[0];
        assert_eq!(request.url, SILENT_CORRECTION_URL);
        let sent: serde_json::Value =
            serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            sent,
            json!({"bucket": "silent-corrections", "filename": "elife-15893-vor-r1.zip"})
        );
    }

    #[test]
    fn test_silent_correction_refusal_is_an_error() {
        let http = Arc::new(ScriptedHttp::new());
        http.respond(Method::Post, SILENT_CORRECTION_URL, 503, "busy");

        let err = SilentCorrectionStarter::new(
            http,
            "https://workflows.example.org",
            "silent-corrections",
            None,
        )
        .article("elife-15893-vor-r1.zip")
        .unwrap_err();
        assert!(err.to_string().contains("HTTP 503: busy"));
    }

    #[test]
    fn test_upload_uses_file_name_as_key() {
        let temp = TempDir::new().unwrap();
        let package = temp.path().join("elife-15893-vor-r1.zip");
        fs::write(&package, b"PK").unwrap();
        let store = Arc::new(MemoryObjectStore::new());

        let key = InputBucket::new(store.clone(), "input").upload(&package).unwrap();

        assert_eq!(key, "elife-15893-vor-r1.zip");
        assert_eq!(store.contents("input", &key), Some(b"PK".to_vec()));
    }

    #[test]
    fn test_upload_missing_file_fails() {
        let store = Arc::new(MemoryObjectStore::new());
        let result = InputBucket::new(store, "input").upload(Path::new("/nonexistent/a.zip"));
        assert!(result.is_err());
    }
}
