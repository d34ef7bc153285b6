//! Stream workload logs through the backend's native logs verb.

use anchor_core::cmd::{self, SystemRunner};
use anchor_core::{BackendKind, Connection};
use anyhow::{Context, Result, bail};
use clap::Args;

use crate::workload::Workload;

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Containers to show the logs of (default: all workload containers)
    pub containers: Vec<String>,

    /// Keep following the logs
    #[arg(short, long)]
    pub follow: bool,

    /// Show timestamps in the log output
    #[arg(short, long)]
    pub timestamps: bool,

    /// Number of lines to show from the end of the logs
    #[arg(long)]
    pub tail: Option<u32>,

    /// Show logs since a duration (5s, 2m, 3h) or an RFC 3339 timestamp
    #[arg(long)]
    pub since: Option<String>,
}

pub fn run(workload: &Workload, backend: Option<&str>, args: &LogsArgs) -> Result<()> {
    let mut cnx = workload.connection(backend);
    let kind = cnx.backend()?;
    match kind {
        BackendKind::ClusterOrchestrator => orchestrator_logs(&mut cnx, workload, args),
        _ => runtime_logs(kind, workload, args),
    }
}

fn runtime_logs(kind: BackendKind, workload: &Workload, args: &LogsArgs) -> Result<()> {
    let tool = kind.command().context("backend not resolved")?;
    let mut log_args: Vec<String> = vec!["logs".to_string()];
    if args.follow {
        log_args.push("-f".to_string());
    }
    if let Some(tail) = args.tail {
        log_args.push(format!("--tail={tail}"));
    }
    if args.timestamps {
        log_args.push("--timestamps".to_string());
    }
    if let Some(since) = &args.since {
        log_args.push(format!("--since={since}"));
    }
    if args.containers.is_empty() {
        log_args.extend(workload.log_containers.iter().map(ToString::to_string));
    } else {
        log_args.extend(args.containers.iter().cloned());
    }

    let argv: Vec<&str> = log_args.iter().map(String::as_str).collect();
    cmd::stream_checked(&SystemRunner, tool, &argv)
        .with_context(|| format!("failed running {tool} logs"))
}

fn orchestrator_logs(cnx: &mut Connection, workload: &Workload, args: &LogsArgs) -> Result<()> {
    let Some(namespace) = cnx.namespace(None)? else {
        bail!("failed to find the {} deployment namespace", workload.app);
    };

    let mut log_args: Vec<String> = vec![
        "logs".to_string(),
        "-n".to_string(),
        namespace,
        workload.selector.to_string(),
    ];
    if args.follow {
        log_args.push("-f".to_string());
    }
    if let Some(tail) = args.tail {
        log_args.push(format!("--tail={tail}"));
    }
    if args.timestamps {
        log_args.push("--timestamps".to_string());
    }
    if let Some(since) = &args.since {
        // kubectl takes timestamps and durations through different flags.
        if is_rfc3339(since) {
            log_args.push(format!("--since-time={since}"));
        } else {
            log_args.push(format!("--since={since}"));
        }
    }

    if args.containers.is_empty() {
        log_args.push("--all-containers=true".to_string());
        let argv: Vec<&str> = log_args.iter().map(String::as_str).collect();
        return cmd::stream_checked(&SystemRunner, "kubectl", &argv)
            .context("failed running kubectl logs");
    }

    for container in &args.containers {
        let mut container_args = log_args.clone();
        container_args.extend(["-c".to_string(), container.clone()]);
        let argv: Vec<&str> = container_args.iter().map(String::as_str).collect();
        cmd::stream_checked(&SystemRunner, "kubectl", &argv)
            .with_context(|| format!("failed running kubectl logs for {container}"))?;
    }
    Ok(())
}

fn is_rfc3339(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
}
