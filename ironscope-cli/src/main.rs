//! Ironscope CLI -- host-activity log analysis from the command line
//!
//! ```text
//! ironscope analyze events.csv
//! ironscope --output json analyze sysmon.txt --row-budget 100000
//! ironscope detect events.csv
//! ironscope rules list --severity high
//! ironscope rules show credential_dumping
//! ironscope config show --section engine
//! ```

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_deref();

    match cli.command {
        // `config validate` must be able to report a broken file itself.
        Commands::Config(args) => {
            init_default_logging(cli.log_level.as_deref());
            commands::config::execute(args, config_path, &writer).await
        }
        command => {
            let loaded = commands::load_config(config_path).await?;
            let level = cli
                .log_level
                .as_deref()
                .unwrap_or(loaded.config.general.log_level.as_str());
            logging::init_tracing(&loaded.config.general, level)
                .map_err(|e| CliError::Config(e.to_string()))?;

            tracing::debug!(source = %loaded.source, "configuration loaded");

            match command {
                Commands::Analyze(args) => {
                    commands::analyze::execute(args, &loaded.config, &writer).await
                }
                Commands::Detect(args) => {
                    commands::detect::execute(args, &loaded.config, &writer).await
                }
                Commands::Rules(args) => commands::rules::execute(args, &writer).await,
                Commands::Config(_) => Ok(()),
            }
        }
    }
}

fn init_default_logging(level: Option<&str>) {
    let general = ironscope_core::config::GeneralConfig::default();
    let level = level.unwrap_or(general.log_level.as_str());
    if let Err(e) = logging::init_tracing(&general, level) {
        eprintln!("warning: {e}");
    }
}
