//! Create a proxy configuration bundle through the server API.
//!
//! Reads the certificate material from disk, asks the server to assemble
//! the bundle and writes the returned tar.gz next to the caller.

use std::fs;
use std::path::PathBuf;

use anchor_core::api;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct ProxyConfigArgs {
    /// Unique, DNS-resolvable FQDN of the proxy
    #[arg(long)]
    pub proxy_name: String,

    /// SSH port the proxy listens on
    #[arg(long, default_value_t = 8022)]
    pub proxy_port: u16,

    /// FQDN of the server the proxy connects to
    #[arg(long)]
    pub server: String,

    /// Maximum cache size in MB
    #[arg(long, default_value_t = 102_400)]
    pub max_cache: i64,

    /// Email of the proxy administrator
    #[arg(long)]
    pub email: String,

    /// Path to the root CA used to sign the proxy certificate, PEM format
    #[arg(long)]
    pub root_ca: PathBuf,

    /// Path to the proxy certificate, PEM format
    #[arg(long)]
    pub proxy_crt: PathBuf,

    /// Path to the proxy certificate private key, PEM format
    #[arg(long)]
    pub proxy_key: PathBuf,

    /// Path to an intermediate CA used to sign the proxy certificate, PEM
    /// format. May be repeated.
    #[arg(long = "intermediate-ca")]
    pub intermediate_cas: Vec<PathBuf>,

    /// Filename to write the bundle to, without extension (default: the
    /// proxy name)
    #[arg(short, long)]
    pub output: Option<String>,

    /// API user
    #[arg(long, env = "ANCHOR_API_USER")]
    pub api_user: String,

    /// API password
    #[arg(long, env = "ANCHOR_API_PASSWORD", hide_env_values = true)]
    pub api_password: String,

    /// Skip TLS verification when talking to the API
    #[arg(long)]
    pub insecure: bool,
}

pub fn run(args: &ProxyConfigArgs) -> Result<()> {
    let root_ca = read_pem(&args.root_ca)?;
    let proxy_crt = read_pem(&args.proxy_crt)?;
    let proxy_key = read_pem(&args.proxy_key)?;
    let intermediate_cas = args
        .intermediate_cas
        .iter()
        .map(read_pem)
        .collect::<Result<Vec<_>>>()?;

    let details = api::ConnectionDetails {
        server: args.server.clone(),
        user: args.api_user.clone(),
        password: args.api_password.clone(),
        insecure: args.insecure,
    };
    let client = api::Client::connect(&details).context("failed to connect to the server")?;

    let request = api::ProxyConfigRequest {
        proxy_name: args.proxy_name.clone(),
        proxy_port: args.proxy_port,
        server: args.server.clone(),
        max_cache: args.max_cache,
        email: args.email.clone(),
        root_ca,
        proxy_crt,
        proxy_key,
        intermediate_cas,
    };
    let bundle = api::create_proxy_config(&client, &request)
        .context("failed to create the proxy configuration bundle")?;

    let stem = args.output.clone().unwrap_or_else(|| args.proxy_name.clone());
    let filename = format!("{stem}.tar.gz");
    fs::write(&filename, bundle).with_context(|| format!("failed to write {filename}"))?;
    println!("Proxy configuration bundle written to {filename}");
    Ok(())
}

fn read_pem(path: &PathBuf) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
