use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use spectrum::checks::PublicationStatus;
use spectrum::logging::DEFAULT_LOG_FILE;
use spectrum::validation::{
    clap_article_id_validator, clap_page_path_validator, clap_timestamp_parser,
};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "spectrum")]
#[command(about = "End-to-end checks for the article publication pipeline", long_about = None)]
#[command(version)]
#[command(subcommand_help_heading = "Commands")]
pub struct Cli {
    /// Settings file (default: $SPECTRUM_SETTINGS, ./settings.toml, then the user config dir)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Environment section of the settings file (default: $SPECTRUM_ENVIRONMENT or end2end)
    #[arg(short, long = "env", global = true)]
    pub environment: Option<String>,

    /// Log level or filter directive, e.g. `debug` or `spectrum=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also write logs to a file
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = DEFAULT_LOG_FILE)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wait for one backend to reach an expected state
    Check {
        #[command(subcommand)]
        command: CheckCommands,
    },

    /// Query the public API
    Api {
        #[command(subcommand)]
        command: ApiCommands,
    },

    /// Load journal pages and verify their resources
    Journal {
        #[command(subcommand)]
        command: JournalCommands,
    },

    /// Ask the dashboard to publish a run of an article version
    Publish {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,
        /// Run identifier, as reported by `check eif`
        run: String,
    },

    /// Upload a package to the production input bucket
    Upload {
        /// Path to the package zip
        package: PathBuf,
    },

    /// Follow an article through the whole pipeline until it is published
    Scenario {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,

        /// Figure name expected on the CDN (repeatable)
        #[arg(long = "figure")]
        figures: Vec<String>,

        /// The article has a PDF
        #[arg(long)]
        pdf: bool,

        /// Upload this package first instead of waiting for an existing ingest
        #[arg(long)]
        package: Option<PathBuf>,

        /// Finally wait until searching for this term finds results
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CheckCommands {
    /// EIF of a version in the EIF bucket
    Eif {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,
        /// Only accept files modified after this RFC 3339 timestamp
        #[arg(long, value_parser = clap_timestamp_parser)]
        after: Option<DateTime<Utc>>,
    },

    /// Archived package of a version in the archive bucket
    Archive {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,
        #[arg(long, value_parser = clap_timestamp_parser)]
        after: Option<DateTime<Utc>>,
    },

    /// Status of a version on the dashboard
    Dashboard {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,
        /// ready-to-publish, publication-in-progress, published or error
        #[arg(value_parser = PublicationStatus::from_str)]
        status: PublicationStatus,
        /// Run that must hold the status
        #[arg(long, conflicts_with = "run_after")]
        run_id: Option<String>,
        /// Only consider runs that started after this RFC 3339 timestamp
        #[arg(long, value_parser = clap_timestamp_parser)]
        run_after: Option<DateTime<Utc>>,
    },

    /// Error event of a run on the dashboard
    DashboardError {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,
        run: String,
    },

    /// Publication flag of a version on the website
    Website {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,
        #[arg(value_enum)]
        state: WebsiteState,
    },

    /// A website path loads successfully
    Visible {
        #[arg(value_parser = clap_page_path_validator)]
        path: String,
    },

    /// Version published in LAX
    Lax {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,
    },

    /// Article XML in the GitHub repository
    Github {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        version: u32,
        /// Text the XML must contain
        #[arg(long)]
        text: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WebsiteState {
    Published,
    Unpublished,
}

#[derive(Subcommand)]
pub enum ApiCommands {
    /// A listing endpoint has at least one item
    List {
        /// e.g. subjects, blog-articles, medium-articles
        endpoint: String,
    },

    /// An article as served by the API
    Article {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        /// Wait for this exact version
        #[arg(long)]
        version: Option<u32>,
        /// Wait until the article field KEY equals the string VALUE; use
        /// KEY:=JSON to expect a typed value such as version:=2 (repeatable)
        #[arg(long = "expect", value_name = "KEY=VALUE", value_parser = spectrum::commands::api::parse_expectation)]
        expectations: Vec<(String, serde_json::Value)>,
    },

    /// Search once
    Search { term: String },

    /// Wait until searching for a term finds results
    WaitSearch { term: String },

    /// Wait until an article has recommendations
    Recommendations {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum JournalCommands {
    Homepage,
    Magazine,

    /// Load one or more paths
    Page {
        #[arg(required = true, value_parser = clap_page_path_validator)]
        paths: Vec<String>,
    },

    /// An article page, and its figures page when it has figures
    Article {
        #[arg(value_parser = clap_article_id_validator)]
        id: String,
        volume: u64,
        #[arg(long)]
        version: Option<u32>,
        #[arg(long)]
        figures: bool,
    },
}
