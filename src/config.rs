//! Per-environment settings.
//!
//! One TOML file holds a table per environment:
//!
//! ```toml
//! [environments.end2end]
//! [environments.end2end.buckets]
//! eif = "end2end-elife-publishing-eif"
//! [environments.end2end.dashboard]
//! host = "https://end2end--ppp-dash.example.org"
//! auth = { user = "spectrum", password = "..." }
//! ```
//!
//! AWS credentials may come from the standard `AWS_*` variables instead of
//! the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::BasicAuth;
use crate::poll::{PollConfig, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::storage::{AwsCredentials, DEFAULT_S3_REGION};

pub const DEFAULT_ENVIRONMENT: &str = "end2end";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

pub const SETTINGS_PATH_VAR: &str = "SPECTRUM_SETTINGS";
pub const ENVIRONMENT_VAR: &str = "SPECTRUM_ENVIRONMENT";
pub const LOG_LEVEL_VAR: &str = "SPECTRUM_LOG_LEVEL";

#[derive(Debug, Clone, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    environments: BTreeMap<String, Settings>,
}

/// Everything needed to reach the backends of one environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub aws: AwsSettings,
    pub buckets: BucketSettings,
    pub website: ServiceSettings,
    pub dashboard: ServiceSettings,
    pub lax: ServiceSettings,
    pub api: ServiceSettings,
    pub journal: ServiceSettings,
    /// Starts the silent correction workflow for an uploaded package
    pub silent_correction: ServiceSettings,
    pub github: GithubSettings,
    pub poll: PollSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    pub region: String,
    /// S3-compatible endpoint; AWS itself when unset
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_S3_REGION.to_string(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: None,
        }
    }
}

impl AwsSettings {
    pub fn credentials(&self) -> AwsCredentials {
        AwsCredentials {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            session_token: self.session_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BucketSettings {
    /// Where article packages are uploaded to start the pipeline
    pub input: String,
    pub eif: String,
    /// CDN origin for published images, XML and PDF
    pub published: String,
    /// CDN origin serving images and PDF to crawlers
    pub bot: String,
    /// CDN origin for XML and PDF downloads
    pub published_download: String,
    /// Long-term archive of processed packages
    pub archive: String,
    /// Where silently corrected packages are uploaded
    pub silent_correction: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub host: String,
    pub auth: Option<BasicAuth>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    /// Base URL serving raw files of the article XML repository
    pub article_xml_repository_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_POLL_TIMEOUT.as_secs(),
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Plain-text copy of the log, in addition to stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Settings {
    /// Load `environment` from the settings file at `path`.
    pub fn load(path: &Path, environment: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        Self::from_toml(&content, environment)
            .with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    pub fn from_toml(content: &str, environment: &str) -> Result<Self> {
        let file: SettingsFile = toml::from_str(content).context("Failed to parse settings")?;

        let available: Vec<&str> = file.environments.keys().map(String::as_str).collect();
        let mut settings = match file.environments.get(environment) {
            Some(settings) => settings.clone(),
            None => bail!(
                "Unknown environment '{environment}'. Available: {}",
                if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                }
            ),
        };

        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("AWS_ACCESS_KEY_ID") {
            self.aws.access_key_id = key;
        }
        if let Ok(secret) = env::var("AWS_SECRET_ACCESS_KEY") {
            self.aws.secret_access_key = secret;
        }
        if let Ok(token) = env::var("AWS_SESSION_TOKEN") {
            self.aws.session_token = Some(token);
        }
        if let Ok(level) = env::var(LOG_LEVEL_VAR) {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_secs == 0 {
            bail!("poll.interval_secs must be greater than zero");
        }
        if self.poll.interval_secs > self.poll.timeout_secs {
            bail!(
                "poll.interval_secs ({}) cannot exceed poll.timeout_secs ({})",
                self.poll.interval_secs,
                self.poll.timeout_secs
            );
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_secs(self.poll.timeout_secs),
            Duration::from_secs(self.poll.interval_secs),
        )
    }
}

/// Pick the settings file: explicit path, then `SPECTRUM_SETTINGS`, then
/// `./settings.toml`, then the user config directory.
pub fn resolve_settings_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = env::var(SETTINGS_PATH_VAR) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(SETTINGS_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("spectrum").join(SETTINGS_FILE_NAME))
        .filter(|path| path.exists())
}

/// Pick the environment name: explicit, then `SPECTRUM_ENVIRONMENT`, then
/// [`DEFAULT_ENVIRONMENT`].
pub fn resolve_environment(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| env::var(ENVIRONMENT_VAR).ok())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}
