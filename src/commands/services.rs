//! Service factory for building command dependencies.
//!
//! Services are built from configuration values but are not part of the
//! configuration itself.

use std::time::Duration;

use anyhow::Result;
use log::debug;

use crate::{
    http::HttpClient,
    registry::{NpmRegistry, NpmSearch},
};

use super::config::Config;

/// Build an HTTP client that gives up after `timeout`
pub fn build_http_client(timeout: Duration) -> Result<HttpClient> {
    debug!("HTTP client configured with {:?} timeout", timeout);
    HttpClient::with_timeout(timeout)
}

/// Build the package search collaborator from configuration
pub fn build_search(config: &Config) -> NpmSearch {
    NpmSearch::from_command_line(&config.search_command)
}

/// Build an npm registry client from configuration
pub fn build_registry(config: &Config) -> Result<NpmRegistry> {
    let http_client = build_http_client(config.timeout)?;
    Ok(NpmRegistry::new(
        http_client,
        &config.registry_url,
        build_search(config),
    ))
}
