//! How the scenario reacts to backends that misbehave.

use serde_json::json;

use spectrum::error::{CheckError, TransportError};
use spectrum::scenario::{PublicationScenario, ScenarioError, ScenarioStage};
use spectrum::Article;

use super::helpers::{
    at, dashboard_version, fake_pipeline, script_happy_path, DASHBOARD, DOWNLOAD_BUCKET,
    EIF_BUCKET, JOURNAL, PUBLISHED_BUCKET, WEBSITE,
};

#[test]
fn test_website_serving_another_article_is_fatal() {
    let pipeline = fake_pipeline();
    pipeline.http.on_get(
        &format!("{WEBSITE}/api/article/15893.1.json"),
        200,
        json!({ "article-id": "00666", "publish": true }).to_string(),
    );

    let checks = pipeline.env.checks();
    match checks.website.published("15893", 1) {
        Err(CheckError::Unrecoverable(failure)) => {
            assert!(failure.reason.contains("different article"), "{}", failure.reason);
            assert!(failure.detail.unwrap().contains("00666"));
        }
        other => panic!("expected an unrecoverable failure, got {other:?}"),
    }
}

#[test]
fn test_dashboard_server_error_aborts_the_scenario() {
    let pipeline = fake_pipeline();
    let store = &pipeline.store;
    store.insert(EIF_BUCKET, "15893.1/run7/elife-15893-v1.json", at(10));
    for bucket in [PUBLISHED_BUCKET, DOWNLOAD_BUCKET] {
        store.insert(bucket, "articles/15893/elife-15893-v1.xml", at(10));
    }
    pipeline.http.on_get(
        &format!("{WEBSITE}/api/article/15893.1.json"),
        200,
        json!({ "article-id": "15893", "publish": false }).to_string(),
    );
    pipeline.http.on_get(
        &format!("{DASHBOARD}/api/article/15893"),
        502,
        "<html>Bad Gateway</html>",
    );

    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();
    let mut scenario = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    let err = scenario.wait_for_publishable(None).unwrap_err();

    assert!(err.to_string().starts_with("dashboard ready to publish failed"), "{err}");
    match err.check_error() {
        Some(CheckError::Unrecoverable(failure)) => {
            assert_eq!(
                failure.detail.as_deref(),
                Some("HTTP 502: <html>Bad Gateway</html>")
            );
        }
        other => panic!("expected an unrecoverable failure, got {other:?}"),
    }
    assert_eq!(scenario.stage(), ScenarioStage::AssetsPropagated);
}

#[test]
fn test_two_runs_with_the_same_id_are_ambiguous() {
    let pipeline = fake_pipeline();
    let mut version = dashboard_version("ready to publish", "run7");
    version["runs"]["2"] = version["runs"]["1"].clone();
    pipeline.http.on_get(
        &format!("{DASHBOARD}/api/article/15893"),
        200,
        json!({ "versions": { "1": version } }).to_string(),
    );

    let checks = pipeline.env.checks();
    let err = checks
        .dashboard
        .ready_to_publish("15893", 1, spectrum::checks::RunSelector::Id("run7".into()))
        .unwrap_err();

    assert!(err.is_unrecoverable());
    assert!(err.to_string().contains("2 runs match"), "{err}");
}

#[test]
fn test_object_store_outage_is_retried_until_timeout() {
    let pipeline = fake_pipeline();
    pipeline
        .store
        .fail_with(TransportError::Connection("connection reset".into()));

    let checks = pipeline.env.checks();
    let err = checks
        .eif
        .of(&Article::new("15893", 1).key_params(), None)
        .unwrap_err();

    assert!(err.is_timeout());
    let last_seen = err.last_seen().expect("timeout should keep the outage");
    assert!(last_seen["transport_error"]
        .as_str()
        .unwrap()
        .contains("connection reset"));
}

#[test]
fn test_broken_resource_fails_the_journal_page() {
    let pipeline = fake_pipeline();
    pipeline.http.on_get(
        &format!("{JOURNAL}/content/5/e15893"),
        200,
        r#"<img src="/missing.png">"#,
    );
    pipeline.http.on_head(&format!("{JOURNAL}/missing.png"), 404);

    let checks = pipeline.env.checks();
    let err = checks.journal.article("15893", 5, None, false).unwrap_err();

    assert!(err.is_unrecoverable());
    assert!(err.to_string().contains("missing.png"), "{err}");
}

#[test]
fn test_refused_publication_is_an_input_error() {
    let pipeline = fake_pipeline();
    script_happy_path(&pipeline, "15893");
    // Accepts once, then refuses
    pipeline.http.respond(
        spectrum::http::Method::Post,
        &format!("{DASHBOARD}/api/queue_article_publication"),
        403,
        "forbidden",
    );

    let checks = pipeline.env.checks();
    let inputs = pipeline.env.inputs();
    let mut scenario = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    let run = scenario.wait_for_publishable(None).unwrap();
    // The 200 scripted by the happy path is consumed first
    scenario.publish(&run).unwrap();

    let mut second = PublicationScenario::new(&checks, &inputs, Article::new("15893", 1));
    second.advance(ScenarioStage::EifProduced).unwrap();
    second.advance(ScenarioStage::AssetsPropagated).unwrap();
    second.advance(ScenarioStage::ReadyToPublish).unwrap();
    let err = second.publish(&run).unwrap_err();

    match err {
        ScenarioError::Input { step, error } => {
            assert_eq!(step, "publish");
            assert!(format!("{error:#}").contains("HTTP 403: forbidden"));
        }
        other => panic!("expected an input error, got {other:?}"),
    }
    assert_eq!(second.stage(), ScenarioStage::ReadyToPublish);
}
