//! HTTP client with a bounded request time.

use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("nph-cli/", env!("NPH_VERSION"));

/// Upper bound for a single request, connection included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin wrapper over reqwest. Requests are never retried; a failed attempt is
/// handed straight back to the caller.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Performs a GET request and deserializes the JSON response.
    ///
    /// A 404 yields `Ok(None)`. Any other non-success status is returned as a
    /// reqwest error carrying that status.
    #[tracing::instrument(skip(self))]
    pub async fn get_json_optional<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> reqwest::Result<Option<T>> {
        debug!("GET JSON from {}...", url);

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} not found", url);
            return Ok(None);
        }

        let response = response.error_for_status()?;
        response.json::<T>().await.map(Some)
    }
}
