//! gridrun -- Kubernetes browser-grid test runner.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;

use gridrun_core::config::GeneralConfig;
use gridrun_core::reporter::Reporter;

use cli::{Cli, Commands};
use error::CliError;
use output::{ConsoleReporter, OutputWriter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = commands::resolve_config_path(cli.config.as_deref());
    let writer = OutputWriter::new(cli.output);

    if let Some(Commands::Config(args)) = cli.command {
        logging::init_tracing(&GeneralConfig::default(), cli.log_level.as_deref())?;
        return commands::config::execute(args, config_path.as_deref(), &writer).await;
    }

    let config = commands::load_config(config_path.as_deref()).await?;
    logging::init_tracing(&config.general, cli.log_level.as_deref())?;
    gridrun_core::metrics::describe_metrics();

    tracing::info!(
        config = %commands::source_label(config_path.as_deref()),
        cleanup = cli.deploy.cleanup,
        "gridrun starting"
    );

    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::for_format(writer.format()));
    let overrides = cli.deploy.overrides();

    if cli.deploy.cleanup {
        commands::teardown::execute(&config, &overrides, &writer, reporter).await
    } else {
        commands::deploy::execute(&config, &overrides, &writer, reporter).await
    }
}
