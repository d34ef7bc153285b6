//! Uniform access to the running workload, whichever backend manages it.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::backend::{BackendKind, Detector};
use crate::cmd::{self, CommandRunner, SystemRunner};
use crate::error::{Error, Result};
use crate::{namespace, workload};

/// Container targeted inside the pod when the caller does not name one.
pub const DEFAULT_POD_CONTAINER: &str = "anchor";

const READY_ATTEMPTS: u32 = 60;
const READY_INTERVAL: Duration = Duration::from_secs(1);

/// One endpoint of a file transfer: either on the local filesystem or
/// inside the managed workload. The `server:` prefix convention only exists
/// at the command line; past [`TransferPath::parse`] the distinction is
/// carried by the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPath {
    Local(PathBuf),
    InWorkload(String),
}

impl TransferPath {
    /// Parse a command-line path, treating a `server:` prefix as "inside
    /// the workload".
    pub fn parse(raw: &str) -> TransferPath {
        match raw.strip_prefix("server:") {
            Some(path) => TransferPath::InWorkload(path.to_string()),
            None => TransferPath::Local(PathBuf::from(raw)),
        }
    }

    pub fn is_in_workload(&self) -> bool {
        matches!(self, TransferPath::InWorkload(_))
    }

    /// Render the endpoint the way the backend copy primitives expect it.
    fn render(&self, workload_id: &str) -> String {
        match self {
            TransferPath::Local(path) => path.display().to_string(),
            TransferPath::InWorkload(path) => format!("{workload_id}:{path}"),
        }
    }
}

/// Handle on the running workload.
///
/// A connection resolves four facets lazily, each exactly once: the backend
/// tool, the container/pod identifier, and (orchestrator only) the
/// application name and its namespace. Resolved facets are kept for the
/// lifetime of the connection and never invalidated, so a connection goes
/// stale if the workload is replaced underneath it (a restart assigning a
/// new pod name, for instance). Construct a new one in that case.
pub struct Connection {
    runner: Box<dyn CommandRunner>,
    backend_override: Option<String>,
    container: String,
    selector: String,
    pod_container: String,

    backend: BackendKind,
    workload_id: Option<String>,
    namespace: Option<String>,
    app_name: Option<String>,
}

impl Connection {
    /// Create a connection. `backend` forces a specific tool (`podman`,
    /// `podman-remote` or `kubectl`); `None` autodetects. `container` is the
    /// runtime container name to look for, `selector` the orchestrator
    /// label selector.
    pub fn new(backend: Option<&str>, container: &str, selector: &str) -> Connection {
        Connection::with_runner(Box::new(SystemRunner), backend, container, selector)
    }

    /// Like [`Connection::new`] with an explicit runner. This is the test
    /// seam: every subprocess the connection would spawn goes through it.
    pub fn with_runner(
        runner: Box<dyn CommandRunner>,
        backend: Option<&str>,
        container: &str,
        selector: &str,
    ) -> Connection {
        Connection {
            runner,
            backend_override: backend.map(ToString::to_string),
            container: container.to_string(),
            selector: selector.to_string(),
            pod_container: DEFAULT_POD_CONTAINER.to_string(),
            backend: BackendKind::Unresolved,
            workload_id: None,
            namespace: None,
            app_name: None,
        }
    }

    /// Target a different container inside the pod, for multi-container
    /// pods. Only meaningful under the orchestrator backend.
    #[must_use]
    pub fn with_pod_container(mut self, name: &str) -> Connection {
        self.pod_container = name.to_string();
        self
    }

    /// Validate or detect the backend tool. The result is cached; repeated
    /// calls re-probe nothing.
    pub fn backend(&mut self) -> Result<BackendKind> {
        if self.backend != BackendKind::Unresolved {
            return Ok(self.backend);
        }
        let kind = match self.backend_override.as_deref() {
            Some(name) => {
                let kind = BackendKind::from_command(name)
                    .ok_or_else(|| Error::UnsupportedBackend(name.to_string()))?;
                if !self.runner.installed(name) {
                    return Err(Error::BackendNotFound(name.to_string()));
                }
                kind
            }
            None => Detector {
                runner: &*self.runner,
                container: &self.container,
                selector: &self.selector,
            }
            .detect()?,
        };
        debug!(backend = %kind, "backend resolved");
        self.backend = kind;
        Ok(kind)
    }

    /// Identifier of the running workload: the container name under the
    /// runtime backend, the pod name under the orchestrator. Cached.
    pub fn workload_id(&mut self) -> Result<String> {
        if let Some(id) = &self.workload_id {
            return Ok(id.clone());
        }
        let backend = self.backend()?;
        let id = workload::resolve(&*self.runner, backend, &self.container, &self.selector)?;
        debug!(%id, "workload resolved");
        self.workload_id = Some(id.clone());
        Ok(id)
    }

    /// Namespace holding the workload, resolved through the helm release of
    /// its application. `Ok(None)` under backends that have no namespace
    /// concept. `app` overrides the application name derived from the
    /// selector. Cached.
    pub fn namespace(&mut self, app: Option<&str>) -> Result<Option<String>> {
        if self.backend()? != BackendKind::ClusterOrchestrator {
            return Ok(None);
        }
        self.resolve_namespace(app).map(Some)
    }

    fn resolve_namespace(&mut self, app_hint: Option<&str>) -> Result<String> {
        if let Some(ns) = &self.namespace {
            return Ok(ns.clone());
        }
        let app = match app_hint {
            Some(app) => app.to_string(),
            None => namespace::app_for_selector(&self.selector)
                .ok_or_else(|| Error::UnknownAppName(self.selector.clone()))?
                .to_string(),
        };
        let ns = namespace::resolve(&*self.runner, &app)?;
        debug!(%app, namespace = %ns, "namespace resolved");
        self.app_name = Some(app);
        self.namespace = Some(ns.clone());
        Ok(ns)
    }

    /// Application name owning the namespace, once resolved.
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    fn tool(&self) -> Result<&'static str> {
        self.backend.command().ok_or_else(|| Error::NoBackendFound {
            container: self.container.clone(),
        })
    }

    /// Run a command inside the workload and return its captured stdout.
    /// Resolves backend, workload and (orchestrator only) namespace on
    /// first use.
    pub fn exec(&mut self, command: &str, args: &[&str]) -> Result<Vec<u8>> {
        let backend = self.backend()?;
        let id = self.workload_id()?;

        let mut exec_args: Vec<String> = vec!["exec".to_string(), id];
        if backend == BackendKind::ClusterOrchestrator {
            let ns = self.resolve_namespace(None)?;
            exec_args.extend([
                "-n".to_string(),
                ns,
                "-c".to_string(),
                self.pod_container.clone(),
                "--".to_string(),
            ]);
        }
        exec_args.push(command.to_string());
        exec_args.extend(args.iter().map(ToString::to_string));

        let argv: Vec<&str> = exec_args.iter().map(String::as_str).collect();
        cmd::run_checked(&*self.runner, self.tool()?, &argv)
    }

    /// Copy a file in or out of the workload using the backend's native
    /// copy primitive. When copying *into* the workload with an `owner`, a
    /// follow-up `chown` runs inside the workload; its failure is reported
    /// as [`Error::OwnershipNotApplied`] since the data has already landed
    /// (no rollback).
    pub fn copy(
        &mut self,
        src: &TransferPath,
        dst: &TransferPath,
        owner: Option<&str>,
        group: Option<&str>,
    ) -> Result<()> {
        let backend = self.backend()?;
        let id = self.workload_id()?;
        let src_arg = src.render(&id);
        let dst_arg = dst.render(&id);

        let mut copy_args: Vec<String> = vec!["cp".to_string()];
        if backend == BackendKind::ClusterOrchestrator {
            let ns = self.resolve_namespace(None)?;
            copy_args.extend([
                "-n".to_string(),
                ns,
                "-c".to_string(),
                self.pod_container.clone(),
            ]);
        }
        copy_args.extend([src_arg, dst_arg]);

        let argv: Vec<&str> = copy_args.iter().map(String::as_str).collect();
        cmd::stream_checked(&*self.runner, self.tool()?, &argv)?;

        if let (Some(user), TransferPath::InWorkload(path)) = (owner, dst) {
            let owner_spec = match group {
                Some(group) => format!("{user}:{group}"),
                None => user.to_string(),
            };
            self.exec("chown", &[owner_spec.as_str(), path.as_str()])
                .map_err(|source| Error::OwnershipNotApplied {
                    path: path.clone(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    /// Block until the workload's service manager reports the multi-user
    /// target active, polling once per second for up to a minute. Probe
    /// failures during polling are swallowed; only the final timeout
    /// surfaces.
    pub fn wait_for_ready(&mut self) -> Result<()> {
        self.wait_for_ready_with(READY_ATTEMPTS, READY_INTERVAL)
    }

    fn wait_for_ready_with(&mut self, attempts: u32, interval: Duration) -> Result<()> {
        // Resolution failures are not transient; surface them before polling.
        self.workload_id()?;

        for attempt in 1..=attempts {
            match self.exec("systemctl", &["is-active", "-q", "multi-user.target"]) {
                Ok(_) => return Ok(()),
                Err(err) => debug!(attempt, error = %err, "workload not ready yet"),
            }
            if attempt < attempts {
                thread::sleep(interval);
            }
        }
        Err(Error::Timeout { attempts })
    }

    /// Check whether `path` exists inside the workload. Collapses every
    /// failure, including the probe failing to run at all, to `false`; a
    /// caller that must distinguish should use [`Connection::exec`].
    pub fn path_exists(&mut self, path: &str) -> bool {
        self.exec("test", &["-e", path]).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::orchestrator::SERVER_FILTER;
    use crate::runtime::SERVER_CONTAINER;
    use crate::testutil::{self, MockRunner};

    fn server_connection(runner: &Rc<MockRunner>, backend: Option<&str>) -> Connection {
        Connection::with_runner(
            Box::new(Rc::clone(runner)),
            backend,
            SERVER_CONTAINER,
            SERVER_FILTER,
        )
    }

    fn podman_runner() -> MockRunner {
        MockRunner::new()
            .installed(&["podman"])
            .on_ok("podman", &["ps", "-q"], "f3a9c41bd2\n")
    }

    fn kubectl_runner() -> MockRunner {
        MockRunner::new()
            .installed(&["kubectl", "helm"])
            .on_ok("kubectl", &["get", "pod"], "anchor-5f7d9")
            .on_ok(
                "helm",
                &["list", "-aA", "-f", "anchor"],
                r#"[{"name":"anchor","namespace":"anchor-prod"}]"#,
            )
    }

    #[test]
    fn unsupported_override_is_rejected_without_probing() {
        let runner = Rc::new(MockRunner::new());
        let mut cnx = server_connection(&runner, Some("docker"));
        let err = cnx.backend().unwrap_err();
        assert!(matches!(err, Error::UnsupportedBackend(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn missing_override_is_rejected_without_probing() {
        let runner = Rc::new(MockRunner::new());
        let mut cnx = server_connection(&runner, Some("kubectl"));
        let err = cnx.backend().unwrap_err();
        assert!(matches!(err, Error::BackendNotFound(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn override_rejection_never_reaches_the_locator() {
        let runner = Rc::new(MockRunner::new());
        let mut cnx = server_connection(&runner, Some("podman"));
        let err = cnx.workload_id().unwrap_err();
        assert!(matches!(err, Error::BackendNotFound(_)));
        assert_eq!(runner.call_count("ps"), 0);
    }

    #[test]
    fn installed_override_is_accepted_unconditionally() {
        let runner = Rc::new(MockRunner::new().installed(&["podman"]));
        let mut cnx = server_connection(&runner, Some("podman"));
        assert_eq!(cnx.backend().unwrap(), BackendKind::ContainerRuntime);
        assert!(runner.calls().is_empty(), "an override is never probed");
    }

    #[test]
    fn detected_backend_is_cached() {
        let runner = Rc::new(
            MockRunner::new()
                .installed(&["kubectl"])
                .on_ok("kubectl", &["get", "pod"], "anchor-5f7d9"),
        );
        let mut cnx = server_connection(&runner, None);

        assert_eq!(cnx.backend().unwrap(), BackendKind::ClusterOrchestrator);
        let probes = runner.calls().len();
        assert_eq!(cnx.backend().unwrap(), BackendKind::ClusterOrchestrator);
        assert_eq!(runner.calls().len(), probes, "cache hit must not re-probe");
    }

    #[test]
    fn runtime_wins_when_the_cluster_has_no_matching_pod() {
        let runner = Rc::new(
            MockRunner::new()
                .installed(&["kubectl", "podman"])
                .on_ok("kubectl", &["get", "pod"], "")
                .on_ok("podman", &["inspect"], "anchor-server"),
        );
        let mut cnx = server_connection(&runner, None);
        assert_eq!(cnx.backend().unwrap(), BackendKind::ContainerRuntime);
    }

    #[test]
    fn no_tools_means_no_backend() {
        let runner = Rc::new(MockRunner::new());
        let mut cnx = server_connection(&runner, None);
        let err = cnx.backend().unwrap_err();
        assert!(matches!(err, Error::NoBackendFound { .. }));
    }

    #[test]
    fn exec_under_podman_targets_the_container() {
        let runner = Rc::new(podman_runner().on_ok("podman", &["exec"], "Tue Aug  6 10:00:00\n"));
        let mut cnx = server_connection(&runner, Some("podman"));
        let out = cnx.exec("date", &[]).unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "Tue Aug  6 10:00:00");
        assert_eq!(
            runner.calls().last().unwrap(),
            "podman exec anchor-server date"
        );
    }

    #[test]
    fn exec_under_kubectl_is_namespace_and_container_qualified() {
        let runner = Rc::new(kubectl_runner().on_ok("kubectl", &["exec"], "ok"));
        let mut cnx = server_connection(&runner, Some("kubectl"));
        cnx.exec("date", &["-u"]).unwrap();
        assert_eq!(
            runner.calls().last().unwrap(),
            "kubectl exec anchor-5f7d9 -n anchor-prod -c anchor -- date -u"
        );
    }

    #[test]
    fn exec_failure_propagates() {
        let runner = Rc::new(podman_runner().on_fail("podman", &["exec"], 127, "date: not found"));
        let mut cnx = server_connection(&runner, Some("podman"));
        let err = cnx.exec("date", &[]).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: 127, .. }));
    }

    #[test]
    fn namespace_is_none_under_the_runtime_backend() {
        let runner = Rc::new(MockRunner::new().installed(&["podman"]));
        let mut cnx = server_connection(&runner, Some("podman"));
        assert_eq!(cnx.namespace(None).unwrap(), None);
    }

    #[test]
    fn namespace_uses_the_app_hint() {
        let runner = Rc::new(MockRunner::new().installed(&["kubectl", "helm"]).on_ok(
            "helm",
            &["list", "-aA", "-f", "anchor-proxy"],
            r#"[{"namespace":"edge"}]"#,
        ));
        let mut cnx = server_connection(&runner, Some("kubectl"));
        assert_eq!(
            cnx.namespace(Some("anchor-proxy")).unwrap(),
            Some("edge".to_string())
        );
        assert_eq!(cnx.app_name(), Some("anchor-proxy"));
    }

    #[test]
    fn unknown_selector_cannot_resolve_a_namespace() {
        let runner = Rc::new(MockRunner::new().installed(&["kubectl"]));
        let mut cnx = Connection::with_runner(
            Box::new(Rc::clone(&runner)),
            Some("kubectl"),
            SERVER_CONTAINER,
            "-lapp=somebody-else",
        );
        let err = cnx.namespace(None).unwrap_err();
        assert!(matches!(err, Error::UnknownAppName(_)));
    }

    #[test]
    fn copy_into_the_workload_applies_ownership_once() {
        let runner = Rc::new(
            podman_runner()
                .on_ok("podman", &["cp"], "")
                .on_ok("podman", &["exec"], ""),
        );
        let mut cnx = server_connection(&runner, Some("podman"));
        cnx.copy(
            &TransferPath::parse("/tmp/config.tar.gz"),
            &TransferPath::parse("server:/srv/config.tar.gz"),
            Some("admin"),
            Some("admin"),
        )
        .unwrap();

        assert_eq!(runner.call_count("chown admin:admin"), 1);
        assert_eq!(
            runner.calls().last().unwrap(),
            "podman exec anchor-server chown admin:admin /srv/config.tar.gz"
        );
    }

    #[test]
    fn copy_out_of_the_workload_never_chowns() {
        let runner = Rc::new(podman_runner().on_ok("podman", &["cp"], ""));
        let mut cnx = server_connection(&runner, Some("podman"));
        cnx.copy(
            &TransferPath::parse("server:/srv/report.txt"),
            &TransferPath::parse("/tmp/report.txt"),
            Some("admin"),
            None,
        )
        .unwrap();
        assert_eq!(runner.call_count("chown"), 0);
    }

    #[test]
    fn chown_failure_is_distinct_from_copy_failure() {
        let runner = Rc::new(
            podman_runner()
                .on_ok("podman", &["cp"], "")
                .on_fail("podman", &["exec"], 1, "chown: invalid user"),
        );
        let mut cnx = server_connection(&runner, Some("podman"));
        let err = cnx
            .copy(
                &TransferPath::parse("/tmp/f"),
                &TransferPath::parse("server:/srv/f"),
                Some("nobody-real"),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::OwnershipNotApplied { .. }));
    }

    #[test]
    fn kubectl_copy_is_namespace_qualified() {
        let runner = Rc::new(kubectl_runner().on_ok("kubectl", &["cp"], ""));
        let mut cnx = server_connection(&runner, Some("kubectl"));
        cnx.copy(
            &TransferPath::parse("/tmp/f"),
            &TransferPath::parse("server:/srv/f"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            runner.calls().last().unwrap(),
            "kubectl cp -n anchor-prod -c anchor /tmp/f anchor-5f7d9:/srv/f"
        );
    }

    #[test]
    fn wait_succeeds_on_the_fifth_attempt() {
        let runner = Rc::new(podman_runner().on_results(
            "podman",
            &["exec"],
            vec![
                testutil::fail(3, "inactive"),
                testutil::fail(3, "inactive"),
                testutil::fail(3, "inactive"),
                testutil::fail(3, "inactive"),
                testutil::ok(""),
            ],
        ));
        let mut cnx = server_connection(&runner, Some("podman"));
        cnx.wait_for_ready_with(10, Duration::ZERO).unwrap();
        assert_eq!(runner.call_count("is-active"), 5);
    }

    #[test]
    fn wait_times_out_after_the_last_attempt() {
        let runner = Rc::new(podman_runner().on_fail("podman", &["exec"], 3, "inactive"));
        let mut cnx = server_connection(&runner, Some("podman"));
        let err = cnx.wait_for_ready_with(3, Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 3 }));
        assert_eq!(runner.call_count("is-active"), 3);
    }

    #[test]
    fn path_probe_collapses_failures_to_false() {
        let runner = Rc::new(podman_runner().on_fail("podman", &["exec"], 1, ""));
        let mut cnx = server_connection(&runner, Some("podman"));
        assert!(!cnx.path_exists("/etc/missing"));
    }

    #[test]
    fn path_probe_reports_existing_paths() {
        let runner = Rc::new(podman_runner().on_ok("podman", &["exec"], ""));
        let mut cnx = server_connection(&runner, Some("podman"));
        assert!(cnx.path_exists("/etc/os-release"));
    }

    #[test]
    fn transfer_paths_parse_the_prefix_convention() {
        assert_eq!(
            TransferPath::parse("server:/srv/f"),
            TransferPath::InWorkload("/srv/f".to_string())
        );
        assert_eq!(
            TransferPath::parse("/tmp/f"),
            TransferPath::Local(PathBuf::from("/tmp/f"))
        );
        assert!(TransferPath::parse("server:/x").is_in_workload());
        assert!(!TransferPath::parse("plain.txt").is_in_workload());
    }

    #[test]
    fn transfer_paths_render_against_the_workload_id() {
        let inside = TransferPath::parse("server:/srv/f");
        assert_eq!(inside.render("anchor-5f7d9"), "anchor-5f7d9:/srv/f");
        let local = TransferPath::parse("/tmp/f");
        assert_eq!(local.render("anchor-5f7d9"), "/tmp/f");
    }
}
