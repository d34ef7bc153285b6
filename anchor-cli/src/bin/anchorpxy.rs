//! Proxy administration tool.

use anchor_cli::commands::{self, logs::LogsArgs};
use anchor_cli::workload;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "anchorpxy", version, about = "Administer the anchor proxy")]
struct Cli {
    /// Backend tool managing the workload: podman, podman-remote or kubectl
    /// (default: autodetect)
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report whether the proxy is up
    Status,

    /// Stream the proxy logs
    Logs(LogsArgs),

    /// Manage the squid cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Debug, Subcommand)]
enum CacheCommands {
    /// Wipe the cache and restart the proxy with empty cache directories
    Clear,
}

fn main() -> Result<()> {
    anchor_cli::init_logging();
    let cli = Cli::parse();
    let backend = cli.backend.as_deref();

    match &cli.command {
        Commands::Status => commands::status::run(&workload::PROXY, backend),
        Commands::Logs(args) => commands::logs::run(&workload::PROXY, backend, args),
        Commands::Cache(CacheCommands::Clear) => commands::cache::clear(backend),
    }
}
