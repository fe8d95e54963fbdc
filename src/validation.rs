//! Validation of command-line input.
//!
//! Article ids and page paths end up in URLs and bucket keys, so they are
//! checked before any backend is contacted.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

/// Maximum allowed length for article ids.
pub const MAX_ARTICLE_ID_LENGTH: usize = 64;

/// Validates an article id.
///
/// An id is valid if it is not empty, no longer than
/// [`MAX_ARTICLE_ID_LENGTH`], and made of alphanumeric characters, dashes
/// and underscores only.
///
/// # Examples
///
/// ```
/// use spectrum::validation::validate_article_id;
///
/// assert!(validate_article_id("15893").is_ok());
/// assert!(validate_article_id("").is_err());
/// assert!(validate_article_id("15893/../x").is_err());
/// ```
pub fn validate_article_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("Article id cannot be empty");
    }

    if id.len() > MAX_ARTICLE_ID_LENGTH {
        bail!(
            "Article id too long: {} characters (max {})",
            id.len(),
            MAX_ARTICLE_ID_LENGTH
        );
    }

    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_chars {
        bail!("Article id '{id}' contains invalid characters. Use only alphanumeric characters, dashes (-), and underscores (_)");
    }

    Ok(())
}

/// Validates a site path: absolute, without a scheme or whitespace.
pub fn validate_page_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        bail!("Path '{path}' must start with '/'");
    }
    if path.starts_with("//") {
        bail!("Path '{path}' must not start with '//'");
    }
    if path.chars().any(char::is_whitespace) {
        bail!("Path '{path}' must not contain whitespace");
    }
    Ok(())
}

/// Parses an RFC 3339 timestamp such as `2016-10-12T17:50:30Z`.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp '{value}', expected RFC 3339"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Clap value parser for article ids.
pub fn clap_article_id_validator(s: &str) -> Result<String, String> {
    validate_article_id(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

/// Clap value parser for site paths.
pub fn clap_page_path_validator(s: &str) -> Result<String, String> {
    validate_page_path(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

/// Clap value parser for timestamps.
pub fn clap_timestamp_parser(s: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(s).map_err(|e| e.to_string())
}
