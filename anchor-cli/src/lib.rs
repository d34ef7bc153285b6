//! Shared command implementations for the `anchorctl` and `anchorpxy`
//! binaries. Each command is thin glue over [`anchor_core::Connection`] or
//! the helper layers; the backend decision logic all lives in the core.

pub mod commands;
pub mod workload;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` controls verbosity.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
