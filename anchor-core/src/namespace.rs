//! Namespace resolution through helm release metadata.
//!
//! Only meaningful under the orchestrator backend: the namespace holding the
//! workload is whatever namespace its helm release was installed into.

use serde::Deserialize;

use crate::cmd::{self, CommandRunner};
use crate::error::{Error, Result};
use crate::orchestrator;

/// One row of `helm list -o json`. Only the namespace is of interest here.
#[derive(Debug, Deserialize)]
pub(crate) struct ReleaseInfo {
    pub namespace: String,
}

/// Map a label selector to the application it belongs to.
pub(crate) fn app_for_selector(selector: &str) -> Option<&'static str> {
    match selector {
        orchestrator::PROXY_FILTER => Some(orchestrator::PROXY_APP),
        orchestrator::SERVER_FILTER => Some(orchestrator::SERVER_APP),
        _ => None,
    }
}

/// Find the namespace of the one release installed for `app`. Zero matches
/// and multiple matches are the same ambiguity error: there is no way to
/// pick a namespace.
pub(crate) fn resolve(runner: &dyn CommandRunner, app: &str) -> Result<String> {
    let out = cmd::run_checked(runner, orchestrator::HELM, &["list", "-aA", "-f", app, "-o", "json"])?;
    let mut releases: Vec<ReleaseInfo> = serde_json::from_slice(&out)?;
    if releases.len() != 1 {
        return Err(Error::AmbiguousRelease {
            app: app.to_string(),
            count: releases.len(),
        });
    }
    Ok(releases.remove(0).namespace)
}
