//! Cluster-orchestrator side of the product: kubectl/helm binaries, label
//! selectors, release names and deployment status.

use serde::Deserialize;
use tracing::debug;

use crate::cmd::{self, CommandRunner};
use crate::error::Result;

pub const KUBECTL: &str = "kubectl";
pub const HELM: &str = "helm";

/// Label selector matching the server pod.
pub const SERVER_FILTER: &str = "-lapp=anchor";

/// Label selector matching the proxy pod.
pub const PROXY_FILTER: &str = "-lapp=anchor-proxy";

/// Helm application name of the server deployment.
pub const SERVER_APP: &str = "anchor";

/// Helm application name of the proxy deployment.
pub const PROXY_APP: &str = "anchor-proxy";

/// Replica counts from a deployment's status subresource.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
    #[serde(default)]
    pub available_replicas: i32,
}

/// Check whether a helm release record exists for `app`, deployed or not.
/// Any failure (helm missing, no cluster) counts as no evidence.
pub fn has_release(runner: &dyn CommandRunner, app: &str) -> bool {
    let out = match cmd::run_checked(runner, HELM, &["list", "-aA", "-f", app, "-o", "json"]) {
        Ok(out) => out,
        Err(err) => {
            debug!(app, error = %err, "helm release probe failed");
            return false;
        }
    };
    match serde_json::from_slice::<Vec<serde_json::Value>>(&out) {
        Ok(releases) => !releases.is_empty(),
        Err(err) => {
            debug!(app, error = %err, "helm produced invalid JSON");
            false
        }
    }
}

/// Fetch the status subresource of the app's deployment.
pub fn deployment_status(
    runner: &dyn CommandRunner,
    namespace: &str,
    app: &str,
) -> Result<DeploymentStatus> {
    let out = cmd::run_checked(
        runner,
        KUBECTL,
        &["get", "deploy", "-n", namespace, app, "-o", "jsonpath={.status}"],
    )?;
    Ok(serde_json::from_slice(&out)?)
}

/// Roll the app's deployment, letting the orchestrator replace its pods.
pub fn restart_deployment(runner: &dyn CommandRunner, namespace: &str, app: &str) -> Result<()> {
    let target = format!("deployment/{app}");
    cmd::stream_checked(
        runner,
        KUBECTL,
        &["rollout", "restart", "-n", namespace, &target],
    )
}
