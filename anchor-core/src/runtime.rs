//! Container-runtime side of the product: podman binaries, container names
//! and the systemd units supervising them.

use tracing::debug;

use crate::cmd::{self, CommandRunner};
use crate::error::Result;

pub const PODMAN: &str = "podman";
pub const PODMAN_REMOTE: &str = "podman-remote";

/// Name of the server container under the runtime backend.
pub const SERVER_CONTAINER: &str = "anchor-server";

/// Proxy containers under the runtime backend. The first one is the one
/// probed when checking for a live proxy.
pub const PROXY_CONTAINERS: [&str; 3] = [
    "anchor-proxy-httpd",
    "anchor-proxy-squid",
    "anchor-proxy-ssh",
];

/// Systemd unit supervising the server container.
pub const SERVER_SERVICE: &str = "anchor-server";

/// Systemd unit supervising the proxy pod.
pub const PROXY_SERVICE: &str = "anchor-proxy-pod";

/// Check whether a systemd unit file for `service` is installed, running or
/// not. Used to recognize a deployed-but-stopped product.
pub fn has_service(runner: &dyn CommandRunner, service: &str) -> bool {
    let unit = format!("{service}.service");
    runner
        .output("systemctl", &["list-unit-files", &unit, "--no-legend"])
        .map(|run| run.success() && !run.stdout_trimmed().is_empty())
        .unwrap_or_else(|err| {
            debug!(service, error = %err, "systemctl probe failed");
            false
        })
}

/// Restart a systemd service, mapping systemctl's output through.
pub fn restart_service(runner: &dyn CommandRunner, service: &str) -> Result<()> {
    let unit = format!("{service}.service");
    cmd::stream_checked(runner, "systemctl", &["restart", &unit])
}
