//! Backend abstraction and connection layer for the anchor toolchain.
//!
//! The anchor server and proxy run either as podman containers supervised by
//! systemd or as pods deployed by helm on a kubernetes cluster. This crate
//! figures out which of the two backends manages the live workload, locates
//! the running container or pod, and exposes a uniform exec/copy/wait
//! interface through [`Connection`] so the command-line tools never need to
//! know which backend is in play.

pub mod api;
pub mod backend;
pub mod cmd;
pub mod connection;
pub mod error;
pub mod orchestrator;
pub mod runtime;

mod namespace;
mod workload;

#[cfg(test)]
pub(crate) mod testutil;

pub use backend::BackendKind;
pub use connection::{Connection, DEFAULT_POD_CONTAINER, TransferPath};
pub use error::{Error, Result};
