//! Backend check adapters.
//!
//! Each adapter wraps one backend and exposes narrow operations that either
//! return a domain value or fail with a [`CheckError`](crate::error::CheckError).
//! All of them are built on [`crate::poll`].
//!
//! HTTP adapters share one reading of status codes:
//! - 200: interpret the body
//! - any other status below 500 (404 included): not yet
//! - 500 and above: unrecoverable, the body is kept in the failure

pub mod api;
pub mod bucket;
pub mod dashboard;
pub mod github;
pub mod html;
pub mod journal;
pub mod lax;
pub mod resources;
pub mod website;

use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{truncate_detail, UnrecoverableFailure};
use crate::http::{HttpFetch, HttpResponse};
use crate::poll::PollResult;
use crate::storage::ObjectStore;

pub use api::ApiCheck;
pub use bucket::{BucketFileCheck, BucketMatch};
pub use dashboard::{DashboardArticleCheck, DashboardStatus, PublicationStatus, RunSelector};
pub use github::GithubCheck;
pub use journal::JournalCheck;
pub use lax::LaxArticleCheck;
pub use resources::{ResourceCache, ResourceLoader};
pub use website::WebsiteArticleCheck;

/// Characters of a response body kept in a not-yet diagnostic
const DIAGNOSTIC_BODY_LENGTH: usize = 500;

pub const EIF_PATTERN: &str = "{id}.{version}/(?P<run>.*)/elife-{id}-v{version}.json";
pub const EIF_PREFIX: &str = "{id}.{version}/";

pub const IMAGE_PATTERN: &str = r"articles/{id}/elife-{id}-{figure_name}-v{version}\.jpg";
pub const XML_PATTERN: &str = r"articles/{id}/elife-{id}-v{version}\.xml";
pub const PDF_PATTERN: &str = r"articles/{id}/elife-{id}-v{version}\.pdf";
pub const PUBLISHED_PREFIX: &str = "articles/{id}/";

pub const ARCHIVE_PATTERN: &str = r"elife-{id}-(poa|vor)-v{version}-20[0-9]{12}\.zip";
pub const ARCHIVE_PREFIX: &str = "elife-{id}-";

/// Every adapter of one environment, sharing one HTTP transport, one object
/// store and one resource cache.
pub struct Checks {
    pub eif: BucketFileCheck,
    pub images_bot_cdn: BucketFileCheck,
    pub images_published_cdn: BucketFileCheck,
    pub xml_published_cdn: BucketFileCheck,
    pub xml_download_published_cdn: BucketFileCheck,
    pub pdf_bot_cdn: BucketFileCheck,
    pub pdf_published_cdn: BucketFileCheck,
    pub pdf_download_published_cdn: BucketFileCheck,
    pub archive: BucketFileCheck,
    pub website: WebsiteArticleCheck,
    pub dashboard: DashboardArticleCheck,
    pub lax: LaxArticleCheck,
    pub api: ApiCheck,
    pub journal: JournalCheck,
    pub github_xml: GithubCheck,
}

impl Checks {
    pub fn from_settings(
        settings: &Settings,
        http: Arc<dyn HttpFetch>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let poll = settings.poll_config();
        let buckets = &settings.buckets;
        let bucket_check = |bucket: &str, pattern: &str, prefix: &str| {
            BucketFileCheck::new(store.clone(), bucket, pattern)
                .with_prefix(prefix)
                .with_poll_config(poll)
        };

        let resources = ResourceLoader::new(http.clone(), Arc::new(ResourceCache::new()));

        Self {
            eif: bucket_check(&buckets.eif, EIF_PATTERN, EIF_PREFIX),
            images_bot_cdn: bucket_check(&buckets.bot, IMAGE_PATTERN, PUBLISHED_PREFIX),
            images_published_cdn: bucket_check(&buckets.published, IMAGE_PATTERN, PUBLISHED_PREFIX),
            xml_published_cdn: bucket_check(&buckets.published, XML_PATTERN, PUBLISHED_PREFIX),
            xml_download_published_cdn: bucket_check(
                &buckets.published_download,
                XML_PATTERN,
                PUBLISHED_PREFIX,
            ),
            pdf_bot_cdn: bucket_check(&buckets.bot, PDF_PATTERN, PUBLISHED_PREFIX),
            pdf_published_cdn: bucket_check(&buckets.published, PDF_PATTERN, PUBLISHED_PREFIX),
            pdf_download_published_cdn: bucket_check(
                &buckets.published_download,
                PDF_PATTERN,
                PUBLISHED_PREFIX,
            ),
            archive: bucket_check(&buckets.archive, ARCHIVE_PATTERN, ARCHIVE_PREFIX),
            website: WebsiteArticleCheck::new(
                http.clone(),
                &settings.website.host,
                settings.website.auth.clone(),
            )
            .with_poll_config(poll),
            dashboard: DashboardArticleCheck::new(
                http.clone(),
                &settings.dashboard.host,
                settings.dashboard.auth.clone(),
            )
            .with_poll_config(poll),
            lax: LaxArticleCheck::new(http.clone(), &settings.lax.host).with_poll_config(poll),
            api: ApiCheck::new(http.clone(), &settings.api.host).with_poll_config(poll),
            journal: JournalCheck::new(http.clone(), &settings.journal.host, resources)
                .with_poll_config(poll),
            github_xml: GithubCheck::new(http, &settings.github.article_xml_repository_url)
                .with_poll_config(poll),
        }
    }
}

/// Apply the shared status-code rule.
///
/// `Ok` hands a 200 response back for interpretation; `Err` carries the poll
/// result to return as is.
pub(crate) fn accept_ok<T>(
    response: HttpResponse,
    backend: &str,
    url: &str,
) -> Result<HttpResponse, PollResult<T>> {
    if response.is_ok() {
        Ok(response)
    } else if response.is_server_error() {
        Err(PollResult::fatal(UnrecoverableFailure::from_response(
            format!("{backend} failed on {url}"),
            response.status,
            &response.body,
        )))
    } else {
        Err(PollResult::not_yet(status_diagnostic(&response)))
    }
}

/// Decode a 200 body; undecodable bodies are reported as not yet.
pub(crate) fn decode_json<T>(response: &HttpResponse) -> Result<Value, PollResult<T>> {
    response.json().map_err(|e| {
        PollResult::not_yet(json!({
            "status": response.status,
            "invalid_json": e.to_string(),
            "body": truncate_detail(&response.body, DIAGNOSTIC_BODY_LENGTH),
        }))
    })
}

/// Snapshot of a response that was not what we waited for.
pub(crate) fn status_diagnostic(response: &HttpResponse) -> Value {
    let body = response
        .json()
        .unwrap_or_else(|_| Value::String(truncate_detail(&response.body, DIAGNOSTIC_BODY_LENGTH)));
    json!({ "status": response.status, "body": body })
}

pub(crate) fn trim_host(host: &str) -> String {
    host.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_ok_classification() {
        let ok: Result<_, PollResult<()>> = accept_ok(HttpResponse::new(200, "{}"), "Website", "u");
        assert!(ok.is_ok());

        match accept_ok::<()>(HttpResponse::new(404, "missing"), "Website", "u") {
            Err(PollResult::NotYet(Some(diagnostic))) => {
                assert_eq!(diagnostic["status"], 404);
                assert_eq!(diagnostic["body"], "missing");
            }
            other => panic!("expected not yet, got {other:?}"),
        }

        match accept_ok::<()>(HttpResponse::new(502, "bad gateway"), "Website", "u") {
            Err(PollResult::Fatal(failure)) => {
                assert_eq!(failure.detail.as_deref(), Some("HTTP 502: bad gateway"));
            }
            other => panic!("expected fatal, got {other:?}"),
        }
    }

    #[test]
    fn test_status_diagnostic_keeps_json_bodies_structured() {
        let diagnostic = status_diagnostic(&HttpResponse::new(403, r#"{"title":"no"}"#));
        assert_eq!(diagnostic["body"]["title"], "no");
    }

    #[test]
    fn test_decode_json_rejects_html() {
        let result = decode_json::<()>(&HttpResponse::new(200, "<html>"));
        assert!(matches!(result, Err(PollResult::NotYet(Some(_)))));
    }

    #[test]
    fn test_from_settings_wires_hosts() {
        let mut settings = Settings::default();
        settings.website.host = "https://website.example.org/".to_string();
        settings.buckets.bot = "bot-cdn".to_string();
        settings.buckets.published_download = "download-cdn".to_string();
        let checks = Checks::from_settings(
            &settings,
            Arc::new(crate::fakes::ScriptedHttp::new()),
            Arc::new(crate::fakes::MemoryObjectStore::new()),
        );
        assert_eq!(checks.website.host(), "https://website.example.org");
        assert_eq!(checks.eif.poll_config(), settings.poll_config());
        assert_eq!(checks.images_bot_cdn.bucket(), "bot-cdn");
        assert_eq!(checks.pdf_bot_cdn.bucket(), "bot-cdn");
        assert_eq!(checks.xml_download_published_cdn.bucket(), "download-cdn");
        assert_eq!(checks.pdf_download_published_cdn.bucket(), "download-cdn");
    }
}
