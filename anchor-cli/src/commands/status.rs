//! Report whether the workload is up.

use anchor_core::cmd::{CommandRunner, SystemRunner};
use anchor_core::{BackendKind, orchestrator};
use anyhow::{Context, Result, bail};

use crate::workload::Workload;

pub fn run(workload: &Workload, backend: Option<&str>) -> Result<()> {
    let mut cnx = workload.connection(backend);
    match cnx.backend()? {
        BackendKind::ClusterOrchestrator => {
            let Some(namespace) = cnx.namespace(None)? else {
                bail!("failed to find the {} deployment namespace", workload.app);
            };
            let status = orchestrator::deployment_status(&SystemRunner, &namespace, workload.app)
                .with_context(|| {
                    format!("failed to get the {} deployment status", workload.app)
                })?;
            if status.ready_replicas != status.replicas {
                eprintln!(
                    "Warning: some replicas are not ready: {} / {}",
                    status.ready_replicas, status.replicas
                );
            }
            if status.available_replicas == 0 {
                bail!("the {} pod is not running", workload.app);
            }
            println!("The {} containers are up and running", workload.name);
        }
        _ => {
            let unit = format!("{}.service", workload.service);
            let run = SystemRunner
                .output("systemctl", &["is-active", "-q", &unit])
                .context("failed to run systemctl")?;
            if !run.success() {
                bail!("the {unit} service is not running");
            }
            println!("The {} service is up and running", workload.service);
        }
    }
    Ok(())
}
