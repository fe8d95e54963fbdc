//! `spectrum scenario`: drive one article through the whole pipeline.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::article::Article;
use crate::checks::Checks;
use crate::input::Inputs;
use crate::scenario::PublicationScenario;

pub struct ScenarioArgs {
    pub id: String,
    pub version: u32,
    pub figures: Vec<String>,
    pub pdf: bool,
    /// Upload this package first; without it the article is expected to
    /// be already ingested.
    pub package: Option<PathBuf>,
    /// Finally wait for the article to be searchable by this term.
    pub search: Option<String>,
}

pub fn execute(checks: &Checks, inputs: &Inputs, args: ScenarioArgs) -> Result<()> {
    let article = Article::new(&args.id, args.version)
        .with_figures(args.figures)
        .with_pdf(args.pdf);
    let mut scenario = PublicationScenario::new(checks, inputs, article);

    println!(
        "{} Scenario for {} v{}",
        "→".cyan().bold(),
        args.id.bold(),
        args.version
    );

    let article_from_api = match &args.package {
        Some(package) => {
            println!("  Ingesting {}", package.display());
            scenario.ingest_and_publish(package)?
        }
        None => {
            let run = scenario.wait_for_publishable(None)?;
            println!("  {} {} (run {run})", "✓".green(), scenario.stage());
            scenario.publish(&run)?;
            println!("  {} {}", "✓".green(), scenario.stage());
            scenario.wait_for_published()?
        }
    };
    println!("  {} {}", "✓".green(), scenario.stage());

    if let Some(term) = &args.search {
        scenario.wait_indexed(term)?;
        println!("  {} {}", "✓".green(), scenario.stage());
    }

    println!(
        "{} {} v{} published in volume {}",
        "✓".green().bold(),
        args.id,
        args.version,
        article_from_api["volume"]
    );
    Ok(())
}
