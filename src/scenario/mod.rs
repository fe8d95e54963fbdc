//! End-to-end publication scenario for one article.
//!
//! Drives the checks in pipeline order:
//!
//! ```text
//! Ingested -> EifProduced -> AssetsPropagated -> ReadyToPublish
//!          -> PublishTriggered -> Published -> Indexed
//! ```
//!
//! The scenario only moves forward and stops at the first failure.

mod stage;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;
use tracing::{info, info_span};

use crate::article::Article;
use crate::checks::{Checks, RunSelector};
use crate::error::{CheckError, UnrecoverableFailure};
use crate::input::Inputs;

pub use stage::ScenarioStage;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("{step} failed: {error}")]
    Check {
        step: &'static str,
        error: CheckError,
    },

    #[error("{step} failed: {error:#}")]
    Input {
        step: &'static str,
        error: anyhow::Error,
    },

    #[error("Invalid scenario transition: {from} -> {to}")]
    InvalidTransition {
        from: ScenarioStage,
        to: ScenarioStage,
    },
}

impl ScenarioError {
    /// The check failure behind this error, if a check failed.
    pub fn check_error(&self) -> Option<&CheckError> {
        match self {
            ScenarioError::Check { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Attach the failing step to a check result.
trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T, ScenarioError>;
}

impl<T> StepContext<T> for Result<T, CheckError> {
    fn step(self, step: &'static str) -> Result<T, ScenarioError> {
        self.map_err(|error| ScenarioError::Check { step, error })
    }
}

pub struct PublicationScenario<'a> {
    checks: &'a Checks,
    inputs: &'a Inputs,
    article: Article,
    stage: ScenarioStage,
    run: Option<String>,
}

impl<'a> PublicationScenario<'a> {
    pub fn new(checks: &'a Checks, inputs: &'a Inputs, article: Article) -> Self {
        Self {
            checks,
            inputs,
            article,
            stage: ScenarioStage::Ingested,
            run: None,
        }
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub fn stage(&self) -> ScenarioStage {
        self.stage
    }

    /// Run found by the EIF check, once known.
    pub fn run(&self) -> Option<&str> {
        self.run.as_deref()
    }

    pub fn advance(&mut self, to: ScenarioStage) -> Result<(), ScenarioError> {
        self.stage = self.stage.try_transition(to)?;
        info!(id = self.article.id(), stage = %self.stage, "Scenario advanced");
        Ok(())
    }

    fn ensure_can_advance(&self, to: ScenarioStage) -> Result<(), ScenarioError> {
        self.stage.try_transition(to).map(|_| ())
    }

    /// Upload a package, then see it through to publication.
    pub fn ingest_and_publish(&mut self, package: &Path) -> Result<Value, ScenarioError> {
        self.inputs
            .production_bucket
            .upload(package)
            .map_err(|error| ScenarioError::Input {
                step: "upload",
                error,
            })?;

        let run = self.wait_for_publishable(None)?;
        self.publish(&run)?;
        self.wait_for_published()
    }

    /// Wait until the ingested version can be published, and return its run.
    ///
    /// With `after`, only an EIF produced after that instant counts, which
    /// tells a re-ingest apart from the previous run.
    pub fn wait_for_publishable(
        &mut self,
        after: Option<DateTime<Utc>>,
    ) -> Result<String, ScenarioError> {
        self.ensure_can_advance(ScenarioStage::EifProduced)?;
        let span = info_span!("article", id = %self.article.id(), version = self.article.version());
        let _entered = span.enter();

        let checks = self.checks;
        let params = self.article.key_params();

        let eif = checks.eif.of(&params, after).step("EIF")?;
        let run = eif
            .capture("run")
            .map(str::to_string)
            .ok_or_else(|| {
                CheckError::from(UnrecoverableFailure::new(format!(
                    "EIF key {} has no run",
                    eif.key
                )))
            })
            .step("EIF")?;
        self.advance(ScenarioStage::EifProduced)?;

        for figure in self.article.figure_names() {
            let figure_params = params.clone().with("figure_name", figure.as_str());
            checks
                .images_bot_cdn
                .of(&figure_params, None)
                .step("bot image")?;
            checks
                .images_published_cdn
                .of(&figure_params, None)
                .step("published image")?;
        }
        checks.xml_published_cdn.of(&params, None).step("published XML")?;
        checks
            .xml_download_published_cdn
            .of(&params, None)
            .step("downloadable XML")?;
        if self.article.has_pdf() {
            checks.pdf_bot_cdn.of(&params, None).step("bot PDF")?;
            checks.pdf_published_cdn.of(&params, None).step("published PDF")?;
            checks
                .pdf_download_published_cdn
                .of(&params, None)
                .step("downloadable PDF")?;
        }
        self.advance(ScenarioStage::AssetsPropagated)?;

        let id = self.article.id();
        let version = self.article.version();
        checks.website.unpublished(id, version).step("website unpublished")?;
        checks
            .dashboard
            .ready_to_publish(id, version, RunSelector::Id(run.clone()))
            .step("dashboard ready to publish")?;
        self.advance(ScenarioStage::ReadyToPublish)?;

        info!(%run, "Article is publishable");
        self.run = Some(run.clone());
        Ok(run)
    }

    /// Ask the dashboard to publish `run`. Done once, never retried.
    pub fn publish(&mut self, run: &str) -> Result<(), ScenarioError> {
        self.ensure_can_advance(ScenarioStage::PublishTriggered)?;
        let span = info_span!("article", id = %self.article.id(), version = self.article.version());
        let _entered = span.enter();

        self.inputs
            .dashboard
            .publish(&self.article, run)
            .map_err(|error| ScenarioError::Input {
                step: "publish",
                error,
            })?;
        self.advance(ScenarioStage::PublishTriggered)
    }

    /// Wait for every downstream system to show the published version.
    /// Returns the article as served by the API.
    pub fn wait_for_published(&mut self) -> Result<Value, ScenarioError> {
        self.ensure_can_advance(ScenarioStage::Published)?;
        let span = info_span!("article", id = %self.article.id(), version = self.article.version());
        let _entered = span.enter();

        let checks = self.checks;
        let id = self.article.id();
        let version = self.article.version();

        checks.dashboard.published(id, version).step("dashboard published")?;
        let version_info = checks.lax.published(id, version).step("LAX published")?;
        checks.website.published(id, version).step("website published")?;

        let path = format!(
            "/content/{}/e{}v{}",
            path_segment(&version_info["volume"]),
            path_segment(&version_info["manuscript_id"]),
            path_segment(&version_info["version"]),
        );
        checks.website.visible(&path).step("website visible")?;

        checks
            .archive
            .of(&self.article.key_params(), None)
            .step("archive")?;
        let article_from_api = checks.api.article(id, version).step("API article")?;

        let volume = article_from_api["volume"]
            .as_u64()
            .ok_or_else(|| {
                CheckError::from(UnrecoverableFailure::from_document(
                    "API article has no volume",
                    &article_from_api,
                ))
            })
            .step("API article")?;
        checks
            .journal
            .article(id, volume, None, self.article.has_figures())
            .step("journal article")?;
        checks
            .github_xml
            .article(id, version, None)
            .step("GitHub XML")?;
        self.advance(ScenarioStage::Published)?;

        info!("Article is published everywhere");
        Ok(article_from_api)
    }

    /// Replace the published XML of this version with `package` without a
    /// new version, and wait for the correction to reach every copy.
    ///
    /// `text_before` must be in the repository XML first; afterwards the API
    /// must serve `title` and the XML must contain `text_after`. The archive
    /// must hold a package newer than the correction.
    pub fn silently_correct(
        &mut self,
        package: &Path,
        text_before: &str,
        text_after: &str,
        title: &str,
    ) -> Result<Value, ScenarioError> {
        if self.stage < ScenarioStage::Published {
            return Err(ScenarioError::InvalidTransition {
                from: self.stage,
                to: ScenarioStage::Published,
            });
        }
        let span = info_span!("article", id = %self.article.id(), version = self.article.version());
        let _entered = span.enter();

        let checks = self.checks;
        let id = self.article.id();
        let version = self.article.version();

        checks
            .github_xml
            .article(id, version, Some(text_before))
            .step("GitHub XML before correction")?;

        let started = Utc::now();
        let filename = self
            .inputs
            .silent_correction_bucket
            .upload(package)
            .map_err(|error| ScenarioError::Input {
                step: "silent correction upload",
                error,
            })?;
        self.inputs
            .silent_correction
            .article(&filename)
            .map_err(|error| ScenarioError::Input {
                step: "silent correction",
                error,
            })?;

        let mut constraints = Map::new();
        constraints.insert("title".to_string(), Value::String(title.to_string()));
        let corrected = checks
            .api
            .wait_article(id, &constraints)
            .step("API corrected article")?;
        checks
            .github_xml
            .article(id, version, Some(text_after))
            .step("GitHub XML after correction")?;
        checks
            .archive
            .of(&self.article.key_params(), Some(started))
            .step("corrected archive")?;

        info!(%filename, "Silent correction is everywhere");
        Ok(corrected)
    }

    /// Wait for the published article to be found by searching for `term`.
    pub fn wait_indexed(&mut self, term: &str) -> Result<Value, ScenarioError> {
        self.ensure_can_advance(ScenarioStage::Indexed)?;
        let span = info_span!("article", id = %self.article.id(), version = self.article.version());
        let _entered = span.enter();

        let results = self.checks.api.wait_search(term).step("search")?;
        self.advance(ScenarioStage::Indexed)?;
        Ok(results)
    }
}

/// Render a JSON scalar as it appears in a URL path.
fn path_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
