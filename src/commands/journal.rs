//! `spectrum journal ...`: rendered pages and their resources.

use anyhow::Result;
use colored::Colorize;

use crate::checks::Checks;

pub fn homepage(checks: &Checks) -> Result<()> {
    checks.journal.homepage()?;
    report("Homepage", checks);
    Ok(())
}

pub fn magazine(checks: &Checks) -> Result<()> {
    checks.journal.magazine()?;
    report("Magazine", checks);
    Ok(())
}

pub fn page(checks: &Checks, paths: &[String]) -> Result<()> {
    for path in paths {
        checks.journal.generic(path)?;
        report(path, checks);
    }
    Ok(())
}

pub fn article(
    checks: &Checks,
    id: &str,
    volume: u64,
    version: Option<u32>,
    has_figures: bool,
) -> Result<()> {
    println!("{} Waiting for the page of {id}...", "→".cyan().bold());
    checks.journal.article(id, volume, version, has_figures)?;
    report(&format!("Article {id}"), checks);
    Ok(())
}

fn report(what: &str, checks: &Checks) {
    println!(
        "{} {what} loaded ({} resources verified so far)",
        "✓".green().bold(),
        checks.journal.resources().cache().len()
    );
}
