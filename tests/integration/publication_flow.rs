//! Full publication of one article through the scenario.

use chrono::{Duration, Utc};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

use spectrum::http::Method;
use spectrum::scenario::{PublicationScenario, ScenarioError, ScenarioStage};
use spectrum::Article;

use super::helpers::{
    at, fake_pipeline, script_happy_path, API, ARCHIVE_BUCKET, DASHBOARD, DOWNLOAD_BUCKET,
    GITHUB, INPUT_BUCKET, PUBLISHED_BUCKET, SILENT_CORRECTION_BUCKET, WORKFLOWS,
};

#[test]
fn test_article_is_followed_until_published() {
    let pipeline = fake_pipeline();
    script_happy_path(&pipeline, "15893");
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let article = Article::new("15893", 1).with_figures(["fig1"]);
    let mut scenario = PublicationScenario::new(&checks, &inputs, article);
    assert_eq!(scenario.stage(), ScenarioStage::Ingested);

    let run = scenario
        .wait_for_publishable(None)
        .expect("Article should become publishable");
    assert_eq!(run, "run7");
    assert_eq!(scenario.run(), Some("run7"));
    assert_eq!(scenario.stage(), ScenarioStage::ReadyToPublish);

    scenario.publish(&run).expect("Publication should be queued");
    assert_eq!(scenario.stage(), ScenarioStage::PublishTriggered);

    let publish_requests: Vec<_> = pipeline
        .http
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::Post)
        .collect();
    assert_eq!(publish_requests.len(), 1);
    assert_eq!(
        publish_requests[0].url,
        format!("{DASHBOARD}/api/queue_article_publication")
    );
    let body: Value =
        serde_json::from_slice(publish_requests[0].body.as_deref().unwrap_or_default()).unwrap();
    assert_eq!(body["articles"][0]["id"], "15893");
    assert_eq!(body["articles"][0]["version"], 1);
    assert_eq!(body["articles"][0]["run"], "run7");

    let article_from_api = scenario
        .wait_for_published()
        .expect("Article should be published everywhere");
    assert_eq!(article_from_api["volume"], 5);
    assert_eq!(scenario.stage(), ScenarioStage::Published);

    // Both resources of the article page are probed once, even though the
    // figures page references them again.
    assert_eq!(checks.journal.resources().cache().len(), 2);
    assert_eq!(
        pipeline
            .http
            .count(Method::Head, "https://journal.example.org/assets/main.css"),
        1
    );
}

#[test]
fn test_article_is_indexed_after_publication() {
    let pipeline = fake_pipeline();
    script_happy_path(&pipeline, "15893");
    pipeline.http.on_get(
        &format!("{API}/search?for=cytomegalovirus"),
        200,
        r#"{"total": 1, "items": [{"id": "15893"}]}"#,
    );
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let mut scenario = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    let run = scenario.wait_for_publishable(None).unwrap();
    scenario.publish(&run).unwrap();
    scenario.wait_for_published().unwrap();

    let results = scenario.wait_indexed("cytomegalovirus").unwrap();
    assert_eq!(results["items"][0]["id"], "15893");
    assert_eq!(scenario.stage(), ScenarioStage::Indexed);
}

#[test]
fn test_ingest_uploads_the_package_first() {
    let pipeline = fake_pipeline();
    script_happy_path(&pipeline, "15893");
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let dir = TempDir::new().unwrap();
    let package = dir.path().join("elife-15893-vor-r1.zip");
    fs::write(&package, b"PK\x03\x04").unwrap();

    let mut scenario = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    scenario
        .ingest_and_publish(&package)
        .expect("Uploaded article should be published");

    assert_eq!(
        pipeline.store.contents(INPUT_BUCKET, "elife-15893-vor-r1.zip"),
        Some(b"PK\x03\x04".to_vec())
    );
    assert_eq!(scenario.stage(), ScenarioStage::Published);
}

#[test]
fn test_publishing_before_publishable_is_rejected() {
    let pipeline = fake_pipeline();
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let mut scenario = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    let err = scenario.publish("run7").unwrap_err();

    assert!(matches!(
        err,
        ScenarioError::InvalidTransition {
            from: ScenarioStage::Ingested,
            to: ScenarioStage::PublishTriggered,
        }
    ));
    // Nothing was sent to the dashboard
    assert!(pipeline.http.requests().is_empty());
    assert_eq!(scenario.stage(), ScenarioStage::Ingested);
}

#[test]
fn test_missing_eif_stops_at_the_first_step() {
    let pipeline = fake_pipeline();
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let mut scenario = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    let err = scenario.wait_for_publishable(None).unwrap_err();

    assert!(err.to_string().starts_with("EIF failed"), "{err}");
    assert!(err.check_error().unwrap().is_timeout());
    assert_eq!(scenario.stage(), ScenarioStage::Ingested);
    assert!(pipeline.http.requests().is_empty());
}

#[test]
fn test_missing_bot_image_blocks_publication() {
    let pipeline = fake_pipeline();
    script_happy_path(&pipeline, "15893");
    pipeline.store.insert(
        PUBLISHED_BUCKET,
        "articles/15893/elife-15893-fig2-v1.jpg",
        at(10),
    );
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let article = Article::new("15893", 1).with_figures(["fig2"]);
    let mut scenario = PublicationScenario::new(&checks, &inputs, article);
    let err = scenario.wait_for_publishable(None).unwrap_err();

    assert!(err.to_string().starts_with("bot image failed"), "{err}");
    assert_eq!(scenario.stage(), ScenarioStage::EifProduced);
}

#[test]
fn test_pdf_must_reach_every_cdn() {
    let pipeline = fake_pipeline();
    script_happy_path(&pipeline, "15893");
    for bucket in [PUBLISHED_BUCKET, DOWNLOAD_BUCKET] {
        pipeline
            .store
            .insert(bucket, "articles/15893/elife-15893-v1.pdf", at(10));
    }
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let article = Article::new("15893", 1).with_pdf(true);
    let mut scenario = PublicationScenario::new(&checks, &inputs, article);
    let err = scenario.wait_for_publishable(None).unwrap_err();

    assert!(err.to_string().starts_with("bot PDF failed"), "{err}");
    assert_eq!(scenario.stage(), ScenarioStage::EifProduced);
}

#[test]
fn test_silent_correction_reaches_every_copy() {
    let pipeline = fake_pipeline();
    script_happy_path(&pipeline, "15893");
    let xml = format!("{GITHUB}/articles/elife-15893-v1.xml");
    pipeline
        .http
        .on_get(&xml, 200, "<article>Human cytomegalovirus IE1</article>");
    pipeline
        .http
        .on_get(&xml, 200, "<article>Human CYTOMEGALOVIRUS IE1</article>");
    pipeline.http.on_get(
        &format!("{API}/articles/15893"),
        200,
        r#"{"id": "15893", "version": 1, "title": "Correction: Human CYTOMEGALOVIRUS IE1"}"#,
    );
    pipeline.http.respond(
        Method::Post,
        &format!("{WORKFLOWS}/api/silent_correction"),
        200,
        "{}",
    );
    // Repackaged after the correction; the one from the first ingest is older
    pipeline.store.insert(
        ARCHIVE_BUCKET,
        "elife-15893-vor-v1-20990101000000.zip",
        Utc::now() + Duration::hours(1),
    );
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let mut scenario = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    let run = scenario.wait_for_publishable(None).unwrap();
    scenario.publish(&run).unwrap();
    scenario.wait_for_published().unwrap();

    let dir = TempDir::new().unwrap();
    let package = dir.path().join("elife-15893-vor-r2.zip");
    fs::write(&package, b"PK\x03\x04").unwrap();

    let corrected = scenario
        .silently_correct(
            &package,
            "cytomegalovirus",
            "CYTOMEGALOVIRUS",
            "Correction: Human CYTOMEGALOVIRUS IE1",
        )
        .expect("Correction should reach the API, the repository and the archive");

    assert_eq!(corrected["title"], "Correction: Human CYTOMEGALOVIRUS IE1");
    assert_eq!(scenario.stage(), ScenarioStage::Published);
    assert_eq!(
        pipeline
            .store
            .contents(SILENT_CORRECTION_BUCKET, "elife-15893-vor-r2.zip"),
        Some(b"PK\x03\x04".to_vec())
    );

    let triggers: Vec<_> = pipeline
        .http
        .requests()
        .into_iter()
        .filter(|r| r.url == format!("{WORKFLOWS}/api/silent_correction"))
        .collect();
    assert_eq!(triggers.len(), 1);
    let body: Value =
        serde_json::from_slice(triggers[0].body.as_deref().unwrap_or_default()).unwrap();
    assert_eq!(body["bucket"], SILENT_CORRECTION_BUCKET);
    assert_eq!(body["filename"], "elife-15893-vor-r2.zip");
}

#[test]
fn test_silent_correction_needs_a_published_article() {
    let pipeline = fake_pipeline();
    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();

    let dir = TempDir::new().unwrap();
    let package = dir.path().join("elife-15893-vor-r2.zip");
    fs::write(&package, b"PK").unwrap();

    let mut scenario = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    let err = scenario
        .silently_correct(&package, "a", "b", "c")
        .unwrap_err();

    assert!(matches!(
        err,
        ScenarioError::InvalidTransition {
            from: ScenarioStage::Ingested,
            to: ScenarioStage::Published,
        }
    ));
    assert!(pipeline.http.requests().is_empty());
    assert_eq!(
        pipeline
            .store
            .contents(SILENT_CORRECTION_BUCKET, "elife-15893-vor-r2.zip"),
        None
    );
}
