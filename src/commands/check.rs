//! `spectrum check ...`: run one backend check and report the outcome.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::article::Article;
use crate::checks::{BucketFileCheck, BucketMatch, Checks, PublicationStatus, RunSelector};

fn waiting(what: &str) {
    println!("{} Waiting for {what}...", "→".cyan().bold());
}

fn done(what: &str) {
    println!("{} {what}", "✓".green().bold());
}

pub fn eif(checks: &Checks, id: &str, version: u32, after: Option<DateTime<Utc>>) -> Result<()> {
    bucket(&checks.eif, "EIF", id, version, after)
}

pub fn archive(checks: &Checks, id: &str, version: u32, after: Option<DateTime<Utc>>) -> Result<()> {
    bucket(&checks.archive, "archived package", id, version, after)
}

fn bucket(
    check: &BucketFileCheck,
    what: &str,
    id: &str,
    version: u32,
    after: Option<DateTime<Utc>>,
) -> Result<()> {
    waiting(&format!("{what} of {id} v{version} in {}", check.bucket()));

    let found = check.of(&Article::new(id, version).key_params(), after)?;
    done(&format!("Found {}", found.key));
    print_captures(&found);
    Ok(())
}

fn print_captures(found: &BucketMatch) {
    for (name, value) in &found.captures {
        println!("  {}: {}", name.dimmed(), value);
    }
    println!(
        "  {}: {}",
        "last modified".dimmed(),
        found.last_modified.to_rfc3339()
    );
}

pub fn dashboard(
    checks: &Checks,
    id: &str,
    version: u32,
    status: PublicationStatus,
    run: RunSelector,
) -> Result<()> {
    waiting(&format!("dashboard to show {id} v{version} as '{status}'"));

    let observed = checks.dashboard.status(id, version, status, run)?;
    done(&format!("Dashboard shows {id} v{version} as '{status}'"));
    if let Some(run) = observed.run {
        println!("  {}: {}", "run-id".dimmed(), run["run-id"]);
    }
    Ok(())
}

pub fn dashboard_error(checks: &Checks, id: &str, version: u32, run: &str) -> Result<()> {
    waiting(&format!("run {run} of {id} v{version} to report an error"));

    let event = checks.dashboard.error(id, version, run)?;
    done("Dashboard reported the error");
    if let Some(message) = event["event-message"].as_str() {
        println!("  {}: {}", "message".dimmed(), message);
    }
    Ok(())
}

pub fn website(checks: &Checks, id: &str, version: u32, published: bool) -> Result<()> {
    let state = if published { "published" } else { "unpublished" };
    waiting(&format!("website to have {id} v{version} {state}"));

    if published {
        checks.website.published(id, version)?;
    } else {
        checks.website.unpublished(id, version)?;
    }
    done(&format!("Website has {id} v{version} {state}"));
    Ok(())
}

pub fn visible(checks: &Checks, path: &str) -> Result<()> {
    waiting(&format!("{path} to be visible"));
    checks.website.visible(path)?;
    done(&format!("{path} is visible"));
    Ok(())
}

pub fn lax(checks: &Checks, id: &str, version: u32) -> Result<()> {
    waiting(&format!("LAX to publish {id} v{version}"));

    let entry = checks.lax.published(id, version)?;
    done(&format!("LAX has {id} v{version} published"));
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

pub fn github(checks: &Checks, id: &str, version: u32, text: Option<&str>) -> Result<()> {
    waiting(&format!("XML of {id} v{version} in the repository"));

    let body = checks.github_xml.article(id, version, text)?;
    done(&format!("Repository has the XML ({} bytes)", body.len()));
    Ok(())
}
