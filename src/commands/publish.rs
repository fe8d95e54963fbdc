//! `spectrum publish`: queue a run for publication.

use anyhow::Result;
use colored::Colorize;

use crate::article::Article;
use crate::input::Inputs;

pub fn execute(inputs: &Inputs, id: &str, version: u32, run: &str) -> Result<()> {
    inputs.dashboard.publish(&Article::new(id, version), run)?;
    println!(
        "{} Queued {id} v{version} run {run} for publication",
        "✓".green().bold()
    );
    Ok(())
}
