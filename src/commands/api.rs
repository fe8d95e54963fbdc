//! `spectrum api ...`: public API checks.

use anyhow::{bail, Result};
use colored::Colorize;
use serde_json::{Map, Value};

use crate::checks::api::LIST_ENDPOINTS;
use crate::checks::Checks;

pub fn list(checks: &Checks, endpoint: &str) -> Result<()> {
    if !LIST_ENDPOINTS.contains(&endpoint) {
        bail!(
            "Unknown list endpoint '{endpoint}'. Available: {}",
            LIST_ENDPOINTS.join(", ")
        );
    }

    let body = checks.api.list(endpoint)?;
    println!(
        "{} /{endpoint} lists {} items",
        "✓".green().bold(),
        body["total"]
    );
    Ok(())
}

/// With a version, wait for that exact version; otherwise wait for the
/// article to match `expectations`.
pub fn article(
    checks: &Checks,
    id: &str,
    version: Option<u32>,
    expectations: &[(String, Value)],
) -> Result<()> {
    let article = match version {
        Some(version) => {
            println!("{} Waiting for {id} v{version} in the API...", "→".cyan().bold());
            checks.api.article(id, version)?
        }
        None => {
            println!("{} Waiting for {id} in the API...", "→".cyan().bold());
            checks.api.wait_article(id, &constraints(expectations))?
        }
    };

    println!(
        "{} API serves {id} v{} (volume {})",
        "✓".green().bold(),
        article["version"],
        article["volume"]
    );
    Ok(())
}

pub fn search(checks: &Checks, term: &str) -> Result<()> {
    let body = checks.api.search(term)?;
    println!("{} '{term}': {} results", "✓".green().bold(), body["total"]);
    Ok(())
}

pub fn wait_search(checks: &Checks, term: &str) -> Result<()> {
    println!("{} Waiting for results for '{term}'...", "→".cyan().bold());
    let body = checks.api.wait_search(term)?;
    println!("{} '{term}': {} results", "✓".green().bold(), body["total"]);
    Ok(())
}

pub fn recommendations(checks: &Checks, id: &str) -> Result<()> {
    println!("{} Waiting for recommendations of {id}...", "→".cyan().bold());
    let body = checks.api.wait_recommendations(id)?;
    println!("{} {id}: {} recommendations", "✓".green().bold(), body["total"]);
    Ok(())
}

pub(crate) fn constraints(expectations: &[(String, Value)]) -> Map<String, Value> {
    expectations.iter().cloned().collect()
}

/// Clap value parser for `KEY=VALUE` or `KEY:=JSON`.
///
/// `KEY=VALUE` always expects the string VALUE; `KEY:=JSON` expects the
/// JSON value, so `version:=2` matches the number 2 and `id=15893` the
/// string "15893".
pub fn parse_expectation(s: &str) -> Result<(String, Value), String> {
    let (key, value) = match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => (key, value),
        _ => return Err(format!("Expected KEY=VALUE or KEY:=JSON, got '{s}'")),
    };

    match key.strip_suffix(':') {
        Some("") => Err(format!("Expected KEY:=JSON, got '{s}'")),
        Some(key) => serde_json::from_str(value)
            .map(|expected| (key.to_string(), expected))
            .map_err(|e| format!("Invalid JSON for {key}: {e}")),
        None => Ok((key.to_string(), Value::String(value.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_expectation() {
        assert_eq!(
            parse_expectation("title=Correction: a=b").unwrap(),
            ("title".to_string(), json!("Correction: a=b"))
        );
        assert!(parse_expectation("=x").is_err());
        assert!(parse_expectation(":=2").is_err());
        assert!(parse_expectation("title").is_err());
    }

    #[test]
    fn test_plain_values_are_strings() {
        // Manuscript ids look numeric but the API serves them as strings
        assert_eq!(
            parse_expectation("id=15893").unwrap(),
            ("id".to_string(), json!("15893"))
        );
        assert_eq!(
            parse_expectation("published=true").unwrap().1,
            json!("true")
        );
    }

    #[test]
    fn test_typed_values_are_json() {
        assert_eq!(
            parse_expectation("version:=2").unwrap(),
            ("version".to_string(), json!(2))
        );
        assert_eq!(
            parse_expectation(r#"id:="15893""#).unwrap().1,
            json!("15893")
        );
        assert!(parse_expectation("version:=two").is_err());
    }

    #[test]
    fn test_constraints_keep_parsed_types() {
        let constraints = constraints(&[
            parse_expectation("version:=2").unwrap(),
            parse_expectation("id=15893").unwrap(),
        ]);
        assert_eq!(constraints["version"], json!(2));
        assert_eq!(constraints["id"], json!("15893"));
    }
}
