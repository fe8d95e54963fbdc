//! `spectrum upload`: feed a package to the pipeline.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::input::Inputs;

pub fn execute(inputs: &Inputs, package: &Path) -> Result<()> {
    let key = inputs.production_bucket.upload(package)?;
    println!("{} Uploaded {key}", "✓".green().bold());
    Ok(())
}
