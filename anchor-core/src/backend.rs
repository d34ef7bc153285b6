//! Backend detection.
//!
//! A deployed product is managed either by podman (possibly through
//! podman-remote) or by a kubernetes cluster, and more than one of the tools
//! may be installed on the machine running the toolchain. Detection walks an
//! explicit, ordered list of strategies; the first one producing positive
//! evidence wins, and a configured-but-unreachable cluster must never stall
//! the decision.

use std::time::Duration;

use tracing::{debug, info};

use crate::cmd::CommandRunner;
use crate::error::{Error, Result};
use crate::{orchestrator, runtime};

/// Wall-clock bound on the cluster reachability probe.
const CLUSTER_PROBE_DEADLINE: Duration = Duration::from_secs(30);

/// Request timeout passed to kubectl for the same probe.
const CLUSTER_PROBE_REQUEST_TIMEOUT: &str = "--request-timeout=30s";

/// Which backend manages the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Local podman.
    ContainerRuntime,
    /// podman-remote against a remote socket.
    ContainerRuntimeRemote,
    /// A kubernetes cluster reached through kubectl.
    ClusterOrchestrator,
    /// Not determined yet.
    Unresolved,
}

impl BackendKind {
    /// The tool invoked for this backend, `None` while unresolved.
    pub fn command(self) -> Option<&'static str> {
        match self {
            BackendKind::ContainerRuntime => Some(runtime::PODMAN),
            BackendKind::ContainerRuntimeRemote => Some(runtime::PODMAN_REMOTE),
            BackendKind::ClusterOrchestrator => Some(orchestrator::KUBECTL),
            BackendKind::Unresolved => None,
        }
    }

    /// Map an explicitly requested tool name back to its backend.
    pub fn from_command(command: &str) -> Option<BackendKind> {
        match command {
            runtime::PODMAN => Some(BackendKind::ContainerRuntime),
            runtime::PODMAN_REMOTE => Some(BackendKind::ContainerRuntimeRemote),
            orchestrator::KUBECTL => Some(BackendKind::ClusterOrchestrator),
            _ => None,
        }
    }

    pub fn is_runtime(self) -> bool {
        matches!(
            self,
            BackendKind::ContainerRuntime | BackendKind::ContainerRuntimeRemote
        )
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.command() {
            Some(command) => write!(f, "{command}"),
            None => write!(f, "unresolved"),
        }
    }
}

/// Autodetection over one workload identity.
pub(crate) struct Detector<'a> {
    pub runner: &'a dyn CommandRunner,
    /// Container name probed under the runtime backend.
    pub container: &'a str,
    /// Label selector probed under the orchestrator backend.
    pub selector: &'a str,
}

impl Detector<'_> {
    /// Run the strategies in their fixed order. Priority: a reachable
    /// cluster running the workload, then a runtime container of the
    /// expected name, then deployment records of a stopped product.
    pub fn detect(&self) -> Result<BackendKind> {
        let strategies = [
            Self::cluster_probe,
            Self::runtime_probe,
            Self::service_indicator,
        ];
        for strategy in strategies {
            if let Some(kind) = strategy(self) {
                return Ok(kind);
            }
        }
        Err(Error::NoBackendFound {
            container: self.container.to_string(),
        })
    }

    /// Strategy 1: a reachable cluster with at least one pod matching the
    /// selector is unambiguous evidence for kubectl. Anything else, timeout
    /// included, is no evidence.
    pub(crate) fn cluster_probe(&self) -> Option<BackendKind> {
        if !self.runner.installed(orchestrator::KUBECTL) {
            return None;
        }
        let args = [
            CLUSTER_PROBE_REQUEST_TIMEOUT,
            "get",
            "pod",
            self.selector,
            "-A",
            "-o=jsonpath={.items[*].metadata.name}",
        ];
        match self
            .runner
            .output_within(orchestrator::KUBECTL, &args, CLUSTER_PROBE_DEADLINE)
        {
            Ok(run) if run.success() && !run.stdout_trimmed().is_empty() => {
                Some(BackendKind::ClusterOrchestrator)
            }
            Ok(_) => {
                info!("kubectl is not connected to a cluster running the workload, ignoring");
                None
            }
            Err(err) => {
                info!(error = %err, "cluster probe did not answer, ignoring");
                None
            }
        }
    }

    /// Strategy 2: podman before podman-remote; the first installed binary
    /// that knows a container of the expected name wins.
    pub(crate) fn runtime_probe(&self) -> Option<BackendKind> {
        let candidates = [
            (runtime::PODMAN, BackendKind::ContainerRuntime),
            (runtime::PODMAN_REMOTE, BackendKind::ContainerRuntimeRemote),
        ];
        for (bin, kind) in candidates {
            if !self.runner.installed(bin) {
                continue;
            }
            match self
                .runner
                .output(bin, &["inspect", self.container, "--format", "{{.Name}}"])
            {
                Ok(run) if run.success() => return Some(kind),
                Ok(_) => debug!(container = self.container, bin, "no such container"),
                Err(err) => debug!(bin, error = %err, "runtime probe failed"),
            }
        }
        None
    }

    /// Strategy 3: nothing is live, but one of the tools is installed and a
    /// deployment record exists: a product systemd unit on the runtime side,
    /// a helm release record on the cluster side. Covers "installed but
    /// currently stopped".
    pub(crate) fn service_indicator(&self) -> Option<BackendKind> {
        let has_runtime = self.runner.installed(runtime::PODMAN)
            || self.runner.installed(runtime::PODMAN_REMOTE);
        if has_runtime
            && (runtime::has_service(self.runner, runtime::SERVER_SERVICE)
                || runtime::has_service(self.runner, runtime::PROXY_SERVICE))
        {
            return Some(BackendKind::ContainerRuntime);
        }

        if self.runner.installed(orchestrator::KUBECTL)
            && (orchestrator::has_release(self.runner, orchestrator::SERVER_APP)
                || orchestrator::has_release(self.runner, orchestrator::PROXY_APP))
        {
            return Some(BackendKind::ClusterOrchestrator);
        }
        None
    }
}
