//! Shared fixtures: one fake environment with every backend scripted.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use spectrum::commands::Environment;
use spectrum::config::Settings;
use spectrum::fakes::{MemoryObjectStore, ScriptedHttp};

pub const WEBSITE: &str = "https://website.example.org";
pub const DASHBOARD: &str = "https://dashboard.example.org";
pub const LAX: &str = "https://lax.example.org";
pub const API: &str = "https://api.example.org";
pub const JOURNAL: &str = "https://journal.example.org";
pub const GITHUB: &str = "https://raw.example.org/article-xml/master";
pub const WORKFLOWS: &str = "https://workflows.example.org";

pub const INPUT_BUCKET: &str = "end2end-production-final";
pub const EIF_BUCKET: &str = "end2end-eif";
pub const PUBLISHED_BUCKET: &str = "end2end-published";
pub const BOT_BUCKET: &str = "end2end-bot-cdn";
pub const DOWNLOAD_BUCKET: &str = "end2end-download-cdn";
pub const ARCHIVE_BUCKET: &str = "end2end-archive";
pub const SILENT_CORRECTION_BUCKET: &str = "end2end-silent-corrections";

pub struct FakePipeline {
    pub http: Arc<ScriptedHttp>,
    pub store: Arc<MemoryObjectStore>,
    pub env: Environment,
}

/// Settings pointing at the fake hosts. Every check observes once and gives
/// up immediately, so each scripted reply is consumed by exactly one check.
pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.website.host = WEBSITE.to_string();
    settings.dashboard.host = DASHBOARD.to_string();
    settings.lax.host = LAX.to_string();
    settings.api.host = API.to_string();
    settings.journal.host = JOURNAL.to_string();
    settings.silent_correction.host = WORKFLOWS.to_string();
    settings.github.article_xml_repository_url = GITHUB.to_string();
    settings.buckets.input = INPUT_BUCKET.to_string();
    settings.buckets.eif = EIF_BUCKET.to_string();
    settings.buckets.published = PUBLISHED_BUCKET.to_string();
    settings.buckets.bot = BOT_BUCKET.to_string();
    settings.buckets.published_download = DOWNLOAD_BUCKET.to_string();
    settings.buckets.archive = ARCHIVE_BUCKET.to_string();
    settings.buckets.silent_correction = SILENT_CORRECTION_BUCKET.to_string();
    settings.poll.timeout_secs = 0;
    settings.poll.interval_secs = 1;
    settings
}

pub fn fake_pipeline() -> FakePipeline {
    let http = Arc::new(ScriptedHttp::new());
    let store = Arc::new(MemoryObjectStore::new());
    let env = Environment::with_backends("end2end", settings(), http.clone(), store.clone());
    FakePipeline { http, store, env }
}

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 5, 5, hour, 0, 0).unwrap()
}

pub fn dashboard_version(status: &str, run_id: &str) -> Value {
    json!({
        "details": { "publication-status": status },
        "runs": {
            "1": {
                "run-id": run_id,
                "first-event-timestamp": 1462449600.0,
                "events": [{ "event-status": "end", "event-type": "Expand Article" }]
            }
        }
    })
}

/// Script every backend so that article `id` v1 (run `run7`) goes all the
/// way from ingested to published.
pub fn script_happy_path(pipeline: &FakePipeline, id: &str) {
    let http = &pipeline.http;
    let store = &pipeline.store;

    store.insert(EIF_BUCKET, &format!("{id}.1/run7/elife-{id}-v1.json"), at(10));
    for bucket in [PUBLISHED_BUCKET, DOWNLOAD_BUCKET] {
        store.insert(bucket, &format!("articles/{id}/elife-{id}-v1.xml"), at(10));
    }
    for bucket in [BOT_BUCKET, PUBLISHED_BUCKET] {
        store.insert(bucket, &format!("articles/{id}/elife-{id}-fig1-v1.jpg"), at(10));
    }
    store.insert(
        ARCHIVE_BUCKET,
        &format!("elife-{id}-vor-v1-20160505120000.zip"),
        at(12),
    );

    let website_article = format!("{WEBSITE}/api/article/{id}.1.json");
    http.on_get(
        &website_article,
        200,
        json!({ "article-id": id, "publish": false }).to_string(),
    );
    http.on_get(
        &website_article,
        200,
        json!({ "article-id": id, "publish": true }).to_string(),
    );
    http.on_get(&format!("{WEBSITE}/content/5/e{id}v1"), 200, "<html></html>");

    let dashboard_article = format!("{DASHBOARD}/api/article/{id}");
    http.on_get(
        &dashboard_article,
        200,
        json!({ "versions": { "1": dashboard_version("ready to publish", "run7") } }).to_string(),
    );
    http.on_get(
        &dashboard_article,
        200,
        json!({ "versions": { "1": dashboard_version("published", "run7") } }).to_string(),
    );
    http.respond(
        spectrum::http::Method::Post,
        &format!("{DASHBOARD}/api/queue_article_publication"),
        200,
        "{}",
    );

    http.on_get(
        &format!("{LAX}/api/v1/article/10.7554/eLife.{id}/version"),
        200,
        json!({ "1": { "volume": 5, "manuscript_id": id, "version": 1, "status": "published" } })
            .to_string(),
    );

    http.on_get(
        &format!("{API}/articles/{id}/versions/1"),
        200,
        json!({ "id": id, "version": 1, "volume": 5, "title": "Human CYTOMEGALOVIRUS" })
            .to_string(),
    );

    let page = r#"<html><head><link rel="stylesheet" href="/assets/main.css"></head>
        <body><img src="https://cdn.example.org/fig1.jpg"></body></html>"#;
    http.on_get(&format!("{JOURNAL}/content/5/e{id}"), 200, page);
    http.on_get(&format!("{JOURNAL}/content/5/e{id}/figures"), 200, page);
    http.on_head(&format!("{JOURNAL}/assets/main.css"), 200);
    http.on_head("https://cdn.example.org/fig1.jpg", 200);

    http.on_get(
        &format!("{GITHUB}/articles/elife-{id}-v1.xml"),
        200,
        "<article>Human CYTOMEGALOVIRUS</article>",
    );
}
