//! tierbed command-line entry point.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::Path;

use clap::Parser;

use tierbed_core::config::{GeneralConfig, TierbedConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let level = cli.log_level.as_deref();

    match cli.command {
        Commands::Validate => {
            // load errors are part of the validation report
            init_logging(GeneralConfig::default(), level);
            commands::validate::execute(&cli.config, &writer).await
        }
        Commands::Names => {
            let config = load_config(&cli.config, level).await?;
            commands::names::execute(&config, &writer)
        }
        Commands::Simulate(args) => {
            let config = load_config(&cli.config, level).await?;
            commands::simulate::execute(args, &config, &writer).await
        }
    }
}

async fn load_config(path: &Path, level: Option<&str>) -> Result<TierbedConfig, CliError> {
    let config = TierbedConfig::load(path).await?;
    init_logging(config.general.clone(), level);
    Ok(config)
}

fn init_logging(mut general: GeneralConfig, level: Option<&str>) {
    if let Some(level) = level {
        general.log_level = level.to_owned();
    }
    if let Err(err) = logging::init_tracing(&general) {
        eprintln!("warning: {err:#}");
    }
}
