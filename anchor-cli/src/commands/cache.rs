//! Manage the proxy's squid cache.

use anchor_core::cmd::SystemRunner;
use anchor_core::{BackendKind, Connection, orchestrator, runtime};
use anyhow::{Context, Result, bail};

/// Wipe the cache and bring the proxy back with empty cache directories.
pub fn clear(backend: Option<&str>) -> Result<()> {
    // The cache lives in the squid container of the proxy.
    let mut cnx = Connection::new(backend, "anchor-proxy-squid", orchestrator::PROXY_FILTER)
        .with_pod_container("squid");

    cnx.exec("sh", &["-c", "find /var/cache/squid -mindepth 1 -delete"])
        .context("failed to remove the cached data")?;

    match cnx.backend()? {
        BackendKind::ClusterOrchestrator => {
            let Some(namespace) = cnx.namespace(None)? else {
                bail!("failed to find the proxy deployment namespace");
            };
            orchestrator::restart_deployment(&SystemRunner, &namespace, orchestrator::PROXY_APP)
                .context("failed to restart the proxy deployment")?;
        }
        _ => {
            cnx.exec("sh", &["-c", "squid -z --foreground"])
                .context("failed to re-create the cache directories")?;
            runtime::restart_service(&SystemRunner, runtime::PROXY_SERVICE)
                .context("failed to restart the proxy service")?;
        }
    }

    println!("Proxy cache cleared");
    Ok(())
}
