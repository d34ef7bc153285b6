//! Error types for the connection and backend layer.

use std::io;

/// Result type alias for anchor-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or operating on a workload.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration errors (explicit backend override)
    // =========================================================================
    /// The requested backend is not one of the supported tools.
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// The requested backend tool is not installed.
    #[error("backend command not found in PATH: {0}")]
    BackendNotFound(String),

    // =========================================================================
    // Not-found errors
    // =========================================================================
    /// No backend is managing the workload.
    #[error("container {container} is not accessible with podman, podman-remote or kubectl")]
    NoBackendFound { container: String },

    /// The runtime backend knows no running container of that name.
    #[error("container {0} is not running")]
    ContainerNotRunning(String),

    /// The orchestrator backend has no pod matching the selector.
    #[error("no pod matching {0} is running")]
    PodNotRunning(String),

    /// The selector maps to no known application name.
    #[error("could not determine the application name for selector {0}")]
    UnknownAppName(String),

    /// The release listing did not return exactly one candidate.
    #[error("found {count} {app} releases, expected exactly one")]
    AmbiguousRelease { app: String, count: usize },

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// The subprocess could not be spawned at all.
    #[error("failed to run {command}")]
    Execution {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The subprocess ran but exited unsuccessfully.
    #[error("{command} exited with status {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The file was copied into the workload but the requested owner could
    /// not be applied. The data is in place; no rollback is attempted.
    #[error("{path} was copied but changing its owner failed")]
    OwnershipNotApplied {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// The readiness wait exhausted its attempts.
    #[error("workload did not become ready within {attempts} attempts")]
    Timeout { attempts: u32 },

    // =========================================================================
    // API and parsing errors
    // =========================================================================
    /// The server API reported a failure.
    #[error("server API error: {0}")]
    Api(String),

    /// The HTTP transport failed.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// A tool produced output that could not be parsed as JSON.
    #[error("invalid JSON output")]
    InvalidJson(#[from] serde_json::Error),
}
