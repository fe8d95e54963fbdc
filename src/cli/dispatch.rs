use anyhow::Result;
use spectrum::checks::RunSelector;
use spectrum::commands::scenario::ScenarioArgs;
use spectrum::commands::{api, check, journal, publish, scenario, upload, Environment};
use spectrum::logging::init_logging;
use tracing::debug;

use super::types::{ApiCommands, CheckCommands, Cli, Commands, JournalCommands, WebsiteState};

pub fn dispatch(cli: Cli) -> Result<()> {
    let mut env = Environment::load(cli.settings.as_deref(), cli.environment.as_deref())?;
    if let Some(level) = cli.log_level {
        env.settings.logging.level = level;
    }
    if let Some(file) = cli.log_file {
        env.settings.logging.file = Some(file);
    }
    init_logging(&env.settings.logging)?;
    debug!(environment = %env.name, "Environment ready");

    let checks = env.checks();
    match cli.command {
        Commands::Check { command } => match command {
            CheckCommands::Eif { id, version, after } => check::eif(&checks, &id, version, after),
            CheckCommands::Archive { id, version, after } => {
                check::archive(&checks, &id, version, after)
            }
            CheckCommands::Dashboard {
                id,
                version,
                status,
                run_id,
                run_after,
            } => {
                let run = match (run_id, run_after) {
                    (Some(run_id), _) => RunSelector::Id(run_id),
                    (None, Some(after)) => RunSelector::After(after),
                    (None, None) => RunSelector::Any,
                };
                check::dashboard(&checks, &id, version, status, run)
            }
            CheckCommands::DashboardError { id, version, run } => {
                check::dashboard_error(&checks, &id, version, &run)
            }
            CheckCommands::Website { id, version, state } => {
                check::website(&checks, &id, version, state == WebsiteState::Published)
            }
            CheckCommands::Visible { path } => check::visible(&checks, &path),
            CheckCommands::Lax { id, version } => check::lax(&checks, &id, version),
            CheckCommands::Github { id, version, text } => {
                check::github(&checks, &id, version, text.as_deref())
            }
        },
        Commands::Api { command } => match command {
            ApiCommands::List { endpoint } => api::list(&checks, &endpoint),
            ApiCommands::Article {
                id,
                version,
                expectations,
            } => api::article(&checks, &id, version, &expectations),
            ApiCommands::Search { term } => api::search(&checks, &term),
            ApiCommands::WaitSearch { term } => api::wait_search(&checks, &term),
            ApiCommands::Recommendations { id } => api::recommendations(&checks, &id),
        },
        Commands::Journal { command } => match command {
            JournalCommands::Homepage => journal::homepage(&checks),
            JournalCommands::Magazine => journal::magazine(&checks),
            JournalCommands::Page { paths } => journal::page(&checks, &paths),
            JournalCommands::Article {
                id,
                volume,
                version,
                figures,
            } => journal::article(&checks, &id, volume, version, figures),
        },
        Commands::Publish { id, version, run } => publish::execute(&env.inputs(), &id, version, &run),
        Commands::Upload { package } => upload::execute(&env.inputs(), &package),
        Commands::Scenario {
            id,
            version,
            figures,
            pdf,
            package,
            search,
        } => scenario::execute(
            &checks,
            &env.inputs(),
            ScenarioArgs {
                id,
                version,
                figures,
                pdf,
                package,
                search,
            },
        ),
    }
}
