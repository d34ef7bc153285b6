//! Run a command inside the workload and print its output.

use std::io::Write;

use anyhow::{Context, Result};

use crate::workload::Workload;

pub fn run(
    workload: &Workload,
    backend: Option<&str>,
    command: &str,
    args: &[String],
) -> Result<()> {
    let mut cnx = workload.connection(backend);
    let argv: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = cnx.exec(command, &argv).with_context(|| {
        format!("failed to run {command} inside the {} workload", workload.name)
    })?;
    std::io::stdout().write_all(&out)?;
    Ok(())
}
