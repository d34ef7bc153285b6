//! Command implementations shared by the binaries.

pub mod cache;
pub mod config;
pub mod cp;
pub mod exec;
pub mod logs;
pub mod status;
pub mod wait;
