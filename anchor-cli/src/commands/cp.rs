//! Copy a file in or out of the workload.

use anchor_core::TransferPath;
use anyhow::{Context, Result, bail};

use crate::workload::Workload;

pub fn run(
    workload: &Workload,
    backend: Option<&str>,
    src: &str,
    dst: &str,
    user: Option<&str>,
    group: Option<&str>,
) -> Result<()> {
    let src = TransferPath::parse(src);
    let dst = TransferPath::parse(dst);
    if src.is_in_workload() == dst.is_in_workload() {
        bail!("exactly one of the source and destination must carry the server: prefix");
    }

    let mut cnx = workload.connection(backend);
    cnx.copy(&src, &dst, user, group)
        .with_context(|| format!("failed to copy to the {} workload", workload.name))?;
    Ok(())
}
