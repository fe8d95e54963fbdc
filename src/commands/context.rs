use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::checks::Checks;
use crate::config::{resolve_environment, resolve_settings_path, Settings};
use crate::http::{HttpFetch, ReqwestFetcher};
use crate::input::Inputs;
use crate::storage::{ObjectStore, S3Client};

/// Settings and backend connections of the environment under test.
pub struct Environment {
    pub name: String,
    pub settings: Settings,
    http: Arc<dyn HttpFetch>,
    store: Arc<dyn ObjectStore>,
}

impl Environment {
    pub fn load(settings_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let path = resolve_settings_path(settings_path).context(
            "No settings file found. Pass --settings, set SPECTRUM_SETTINGS or create ./settings.toml",
        )?;
        let name = resolve_environment(environment);
        let settings = Settings::load(&path, &name)?;
        debug!(path = %path.display(), environment = %name, "Loaded settings");

        let http: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new()?);
        let credentials = settings.aws.credentials();
        let store: Arc<dyn ObjectStore> = Arc::new(match &settings.aws.endpoint {
            Some(endpoint) => {
                S3Client::new(http.clone(), endpoint, &settings.aws.region, credentials)
            }
            None => S3Client::aws(http.clone(), &settings.aws.region, credentials),
        });

        Ok(Self::with_backends(name, settings, http, store))
    }

    /// Environment over already-built backends.
    pub fn with_backends(
        name: impl Into<String>,
        settings: Settings,
        http: Arc<dyn HttpFetch>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            http,
            store,
        }
    }

    pub fn checks(&self) -> Checks {
        Checks::from_settings(&self.settings, self.http.clone(), self.store.clone())
    }

    pub fn inputs(&self) -> Inputs {
        Inputs::from_settings(&self.settings, self.http.clone(), self.store.clone())
    }
}
