//! Locates the one running workload instance for a resolved backend.

use crate::backend::BackendKind;
use crate::cmd::{self, CommandRunner};
use crate::error::{Error, Result};
use crate::orchestrator;

/// Resolve the identifier of the running workload: the container name under
/// the runtime backend, the pod name under the orchestrator.
///
/// A tool that fails to run is an execution error; a tool that runs and
/// finds nothing is the matching typed not-found error. The two are never
/// conflated.
pub(crate) fn resolve(
    runner: &dyn CommandRunner,
    backend: BackendKind,
    container: &str,
    selector: &str,
) -> Result<String> {
    match backend {
        BackendKind::ContainerRuntime | BackendKind::ContainerRuntimeRemote => {
            let bin = match backend {
                BackendKind::ContainerRuntimeRemote => crate::runtime::PODMAN_REMOTE,
                _ => crate::runtime::PODMAN,
            };
            let filter = format!("name=^{container}$");
            let out = cmd::run_checked(runner, bin, &["ps", "-q", "-f", &filter])?;
            if String::from_utf8_lossy(&out).trim().is_empty() {
                Err(Error::ContainerNotRunning(container.to_string()))
            } else {
                Ok(container.to_string())
            }
        }
        BackendKind::ClusterOrchestrator => {
            let out = cmd::run_checked(
                runner,
                orchestrator::KUBECTL,
                &[
                    "get",
                    "pod",
                    selector,
                    "-A",
                    "-o=jsonpath={.items[*].metadata.name}",
                ],
            )?;
            let names = String::from_utf8_lossy(&out);
            match names.split_whitespace().next() {
                Some(name) => Ok(name.to_string()),
                None => Err(Error::PodNotRunning(selector.to_string())),
            }
        }
        BackendKind::Unresolved => Err(Error::NoBackendFound {
            container: container.to_string(),
        }),
    }
}
