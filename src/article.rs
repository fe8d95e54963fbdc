//! Article identity and key-template parameters.

use regex::escape;
use std::collections::BTreeMap;

/// DOI prefix under which every article is registered
pub const DOI_PREFIX: &str = "10.7554/eLife";

/// The article a verification scenario is about.
///
/// Runs are not part of the identity: each ingest produces a new run, which
/// the EIF check reports and the scenario carries alongside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    id: String,
    version: u32,
    figure_names: Vec<String>,
    has_pdf: bool,
}

impl Article {
    pub fn new(id: impl Into<String>, version: u32) -> Self {
        Self {
            id: id.into(),
            version,
            figure_names: Vec::new(),
            has_pdf: false,
        }
    }

    pub fn with_figures<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.figure_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pdf(mut self, has_pdf: bool) -> Self {
        self.has_pdf = has_pdf;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn figure_names(&self) -> &[String] {
        &self.figure_names
    }

    pub fn has_figures(&self) -> bool {
        !self.figure_names.is_empty()
    }

    pub fn has_pdf(&self) -> bool {
        self.has_pdf
    }

    pub fn doi(&self) -> String {
        format!("{DOI_PREFIX}.{}", self.id)
    }

    /// `id` and `version` placeholders for key templates.
    pub fn key_params(&self) -> KeyParams {
        KeyParams::new()
            .with("id", &self.id)
            .with("version", self.version.to_string())
    }
}

/// Values substituted into `{name}` placeholders of a key template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParams {
    values: BTreeMap<String, String>,
}

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Fill a regex template. Values are escaped; braces that do not name a
    /// known parameter (`{12}` quantifiers) are left alone.
    pub fn fill_pattern(&self, template: &str) -> String {
        self.fill(template, |value| escape(value))
    }

    /// Fill a literal template, such as a listing prefix.
    pub fn fill_literal(&self, template: &str) -> String {
        self.fill(template, str::to_string)
    }

    fn fill(&self, template: &str, render: impl Fn(&str) -> String) -> String {
        let mut filled = template.to_string();
        for (name, value) in &self.values {
            filled = filled.replace(&format!("{{{name}}}"), &render(value));
        }
        filled
    }
}
