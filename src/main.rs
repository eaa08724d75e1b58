// ABOUTME: Entry point for the k8tunnel CLI application.
// ABOUTME: Parses arguments, installs logging, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use k8tunnel::config;
use k8tunnel::error::Result;
use k8tunnel::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise -v switches from info to debug.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("k8tunnel=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output);
    if let Err(e) = run(cli, &output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    match cli.command {
        Commands::Run { config } => {
            let loaded = config::Config::load_or_default(config.as_deref(), &cwd)?;
            commands::run(loaded, output).await
        }
        Commands::Check { config } => {
            let loaded = config::Config::load_or_default(config.as_deref(), &cwd)?;
            commands::check(loaded, output)
        }
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.success(&format!("Wrote {}", path.display()));
            Ok(())
        }
    }
}
