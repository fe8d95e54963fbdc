//! Loading an environment from a settings file.

use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use spectrum::commands::Environment;

const SETTINGS: &str = r#"
[environments.end2end.buckets]
input = "end2end-production-final"
eif = "end2end-eif"
published = "end2end-cdn"
archive = "end2end-archive"

[environments.end2end.website]
host = "https://end2end--journal.example.org/"

[environments.end2end.dashboard]
host = "https://end2end--dashboard.example.org"
auth = { user = "user", password = "pass" }

[environments.end2end.poll]
timeout_secs = 300
interval_secs = 10

[environments.continuumtest.website]
host = "https://continuumtest--journal.example.org"
"#;

fn write_settings() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("settings.toml");
    fs::write(&path, SETTINGS).expect("Failed to write settings");
    (dir, path)
}

#[test]
#[serial]
fn test_environment_is_loaded_from_explicit_file() {
    let (_dir, path) = write_settings();

    let env = Environment::load(Some(&path), Some("end2end")).expect("Should load end2end");
    assert_eq!(env.name, "end2end");
    assert_eq!(env.settings.buckets.eif, "end2end-eif");

    let checks = env.checks();
    assert_eq!(checks.website.host(), "https://end2end--journal.example.org");
    assert_eq!(checks.eif.bucket(), "end2end-eif");
    assert_eq!(checks.eif.poll_config().timeout, Duration::from_secs(300));
    assert_eq!(checks.eif.poll_config().interval, Duration::from_secs(10));
}

#[test]
#[serial]
fn test_second_environment_keeps_defaults() {
    let (_dir, path) = write_settings();

    let env = Environment::load(Some(&path), Some("continuumtest")).unwrap();
    assert_eq!(env.settings.poll.timeout_secs, 60);
    assert_eq!(env.settings.aws.region, "us-east-1");
}

#[test]
#[serial]
fn test_unknown_environment_lists_available_ones() {
    let (_dir, path) = write_settings();

    let err = Environment::load(Some(&path), Some("prod"))
        .err()
        .expect("Unknown environment should fail");
    let message = format!("{err:#}");
    assert!(message.contains("Unknown environment 'prod'"), "{message}");
    assert!(message.contains("continuumtest, end2end"), "{message}");
}

#[test]
#[serial]
fn test_missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Environment::load(Some(&path), None).err().unwrap();
    assert!(format!("{err:#}").contains("Failed to read settings file"));
}
