//! Static identity of the two managed applications.

use anchor_core::{Connection, orchestrator, runtime};

/// Everything the commands need to know about one managed application.
#[derive(Debug, Clone, Copy)]
pub struct Workload {
    /// Human name used in messages.
    pub name: &'static str,
    /// Runtime container probed for liveness.
    pub container: &'static str,
    /// Orchestrator label selector.
    pub selector: &'static str,
    /// Helm application name.
    pub app: &'static str,
    /// Systemd unit supervising the runtime deployment.
    pub service: &'static str,
    /// Containers whose logs are shown by default.
    pub log_containers: &'static [&'static str],
}

pub const SERVER: Workload = Workload {
    name: "server",
    container: runtime::SERVER_CONTAINER,
    selector: orchestrator::SERVER_FILTER,
    app: orchestrator::SERVER_APP,
    service: runtime::SERVER_SERVICE,
    log_containers: &[runtime::SERVER_CONTAINER],
};

pub const PROXY: Workload = Workload {
    name: "proxy",
    container: runtime::PROXY_CONTAINERS[0],
    selector: orchestrator::PROXY_FILTER,
    app: orchestrator::PROXY_APP,
    service: runtime::PROXY_SERVICE,
    log_containers: &runtime::PROXY_CONTAINERS,
};

impl Workload {
    /// Open a connection to this workload.
    pub fn connection(&self, backend: Option<&str>) -> Connection {
        tracing::debug!(workload = self.name, ?backend, "opening connection");
        Connection::new(backend, self.container, self.selector)
    }
}
