//! Supabase-compatible backend: PostgREST for the request and allowlist tables,
//! GoTrue for credential checks and the user directory.
//!
//! Both services share one base URL and one service-role key. Every call carries the key
//! as `apikey` and as bearer authorization, and is bounded by the configured timeout.
//! Nothing here retries.

mod auth;
mod rest;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{BackendConfig, BackendCredentials};

pub use auth::GoTrueIdentityProvider;
pub use rest::PostgrestStore;

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared HTTP client bound to one project.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(credentials: BackendCredentials, timeout: Duration) -> Result<Self, SupabaseError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: credentials.url.trim_end_matches('/').to_string(),
            service_key: credentials.service_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "supabase request");
        self.http
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

/// Store and identity provider created once at start-up and shared for the process lifetime.
#[derive(Debug, Clone)]
pub struct SupabaseBackend {
    pub store: Arc<PostgrestStore>,
    pub identity: Arc<GoTrueIdentityProvider>,
}

impl SupabaseBackend {
    pub fn connect(
        credentials: BackendCredentials,
        config: &BackendConfig,
    ) -> Result<Self, SupabaseError> {
        let client = SupabaseClient::new(credentials, config.timeout)?;
        info!(base_url = %client.base_url(), "supabase backend configured");

        Ok(Self {
            store: Arc::new(PostgrestStore::new(
                client.clone(),
                config.requests_table.clone(),
                config.dev_accounts_table.clone(),
            )),
            identity: Arc::new(GoTrueIdentityProvider::new(client)),
        })
    }
}

/// Error payload shape shared by PostgREST and GoTrue.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpstreamError {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default, alias = "msg", alias = "error_description")]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) details: Option<String>,
}

impl UpstreamError {
    pub(crate) async fn read(response: Response) -> (reqwest::StatusCode, Self, String) {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<UpstreamError>(&text).unwrap_or_default();
        (status, parsed, text)
    }

    pub(crate) fn describe(&self, status: reqwest::StatusCode, raw: &str) -> String {
        match self.message.as_deref() {
            Some(message) => format!("{status}: {message}"),
            None if raw.trim().is_empty() => status.to_string(),
            None => format!("{status}: {}", raw.trim()),
        }
    }
}
