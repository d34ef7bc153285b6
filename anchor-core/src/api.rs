//! Blocking client for the server's JSON API.
//!
//! The toolchain spawns subprocesses for everything backend-related; the one
//! HTTP surface is the server API used to assemble a proxy configuration
//! bundle. Endpoints answer with a `{success, message, result}` envelope.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// How to reach and authenticate against the server API.
#[derive(Debug, Clone)]
pub struct ConnectionDetails {
    /// Server FQDN.
    pub server: String,
    pub user: String,
    pub password: String,
    /// Skip TLS verification. Only for bootstrapping setups where the
    /// certificate chain is not deployed yet.
    pub insecure: bool,
}

/// Response envelope every API endpoint uses.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub result: Option<T>,
}

/// Authenticated API session.
pub struct Client {
    http: reqwest::blocking::Client,
    base: String,
}

impl Client {
    /// Build the client and log in. The session cookie is retained for
    /// subsequent calls.
    pub fn connect(details: &ConnectionDetails) -> Result<Client> {
        let http = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(details.insecure)
            .build()?;
        let client = Client {
            http,
            base: format!("https://{}/api", details.server),
        };
        client.login(details)?;
        Ok(client)
    }

    fn login(&self, details: &ConnectionDetails) -> Result<()> {
        let body = serde_json::json!({
            "login": details.user,
            "password": details.password,
        });
        let response: ApiResponse<serde_json::Value> = self.post("auth/login", &body)?;
        if !response.success {
            return Err(Error::Api(response.message));
        }
        debug!(user = %details.user, "logged in");
        Ok(())
    }

    /// POST a JSON body and decode the response envelope.
    pub fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse<T>> {
        let url = format!("{}/{}", self.base, path);
        debug!(%url, "POST");
        let response = self.http.post(&url).json(body).send()?.error_for_status()?;
        Ok(response.json()?)
    }
}

/// Request payload for the proxy configuration bundle endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfigRequest {
    pub proxy_name: String,
    pub proxy_port: u16,
    pub server: String,
    pub max_cache: i64,
    pub email: String,
    pub root_ca: String,
    pub proxy_crt: String,
    pub proxy_key: String,
    #[serde(rename = "intermediateCAs")]
    pub intermediate_cas: Vec<String>,
}

/// Ask the server to assemble a proxy configuration bundle. Returns the
/// tar.gz payload, transported base64-encoded in the JSON envelope.
pub fn create_proxy_config(client: &Client, request: &ProxyConfigRequest) -> Result<Vec<u8>> {
    let body = serde_json::to_value(request)?;
    let response: ApiResponse<String> = client.post("proxy/container-config", &body)?;
    if !response.success {
        return Err(Error::Api(response.message));
    }
    let encoded = response
        .result
        .ok_or_else(|| Error::Api("empty bundle payload".to_string()))?;
    BASE64
        .decode(encoded.trim())
        .map_err(|err| Error::Api(format!("invalid bundle payload: {err}")))
}
