//! Block until the workload reports ready.

use anyhow::{Context, Result};

use crate::workload::Workload;

pub fn run(workload: &Workload, backend: Option<&str>) -> Result<()> {
    let mut cnx = workload.connection(backend);
    cnx.wait_for_ready().with_context(|| {
        format!("the {} did not come up, check the service status", workload.name)
    })?;
    println!("The {} is up", workload.name);
    Ok(())
}
