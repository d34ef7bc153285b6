//! Server administration tool.

use anchor_cli::commands::{self, config::ProxyConfigArgs, logs::LogsArgs};
use anchor_cli::workload;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "anchorctl", version, about = "Administer the anchor server")]
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
    /// Run a command inside the server and print its output
    Exec {
        command: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Copy a file in or out of the server (prefix the remote side with server:)
    Cp {
        src: String,
        dst: String,
        /// Owner of the file once copied into the server
        #[arg(long)]
        user: Option<String>,
        /// Group of the file once copied into the server
        #[arg(long)]
        group: Option<String>,
    },

    /// Report whether the server is up
    Status,

    /// Stream the server logs
    Logs(LogsArgs),

    /// Block until the server reports ready
    Wait,

    /// Create a proxy configuration bundle through the server API
    ProxyConfig(Box<ProxyConfigArgs>),
}

fn main() -> Result<()> {
    anchor_cli::init_logging();
    let cli = Cli::parse();
    let backend = cli.backend.as_deref();

    match &cli.command {
        Commands::Exec { command, args } => {
            commands::exec::run(&workload::SERVER, backend, command, args)
        }
        Commands::Cp {
            src,
            dst,
            user,
            group,
        } => commands::cp::run(
            &workload::SERVER,
            backend,
            src,
            dst,
            user.as_deref(),
            group.as_deref(),
        ),
        Commands::Status => commands::status::run(&workload::SERVER, backend),
        Commands::Logs(args) => commands::logs::run(&workload::SERVER, backend, args),
        Commands::Wait => commands::wait::run(&workload::SERVER, backend),
        Commands::ProxyConfig(args) => commands::config::run(args),
    }
}
