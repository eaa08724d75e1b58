// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use k8tunnel::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "k8tunnel")]
#[command(about = "Keep local ports forwarded to a cluster through an SSH bastion")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: normal, quiet or json
    #[arg(long, global = true, default_value = "normal")]
    pub output: OutputMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start all tunnels and keep them up until interrupted
    Run {
        /// Config file (default: k8tunnel.yml in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Resolve the configuration and list tunnels without connecting
    Check {
        /// Config file (default: k8tunnel.yml in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a template k8tunnel.yml into the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
