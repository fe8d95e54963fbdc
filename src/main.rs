use anyhow::Result;
use clap::Parser;

mod cli;

use cli::dispatch::dispatch;
use cli::types::Cli;

fn main() -> Result<()> {
    dispatch(Cli::parse())
}
