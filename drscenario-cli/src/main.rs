use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;

use drscenario_cli::cli::{Cli, Commands};
use drscenario_cli::commands;
use drscenario_cli::logging;
use drscenario_cli::output::OutputWriter;
use drscenario_core::config::ScenarioConfig;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // every cluster call is awaited in sequence; one thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // An invalid config still gets default logging; the command reports the error.
    let general = ScenarioConfig::load(cli.config.as_deref())
        .await
        .map(|c| c.general)
        .unwrap_or_default();
    logging::init_tracing(&general, cli.log_level.as_deref())?;

    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, config_path, &writer).await,
        Commands::Phases(args) => commands::phases::execute(args, config_path, &writer).await,
        Commands::Render(args) => commands::render::execute(args, config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!(error = %e, exit_code = e.exit_code(), "command failed");
            eprintln!("{} {e}", "error:".red().bold());
            Ok(ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1)))
        }
    }
}
