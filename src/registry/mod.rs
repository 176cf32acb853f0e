//! Package registry abstraction.
//!
//! A registry answers two questions about a package name: which versions have
//! been published under it, and which existing names look like it.

mod npm;
mod search;

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

pub use npm::{DEFAULT_REGISTRY_URL, NpmRegistry};
pub use search::{MAX_SUGGESTIONS, NpmSearch, SEARCH_TIMEOUT, parse_search_output};

/// Published metadata for one package.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryEntry {
    pub name: String,
    pub versions: BTreeSet<String>,
}

impl RegistryEntry {
    pub fn new<I, S>(name: &str, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            versions: versions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_version(&self, version: &str) -> bool {
        self.versions.contains(version)
    }
}

/// A lookup that failed for reasons unrelated to whether the package exists.
///
/// These never mean "not found"; absence is reported as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),

    #[error("Failed to parse package data: {0}")]
    InvalidResponse(String),

    #[error("Invalid registry URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            RegistryError::Status(status.as_u16())
        } else if error.is_timeout() {
            RegistryError::Timeout
        } else if error.is_decode() {
            RegistryError::InvalidResponse(error.to_string())
        } else {
            RegistryError::Network(error.to_string())
        }
    }
}

/// Source of package metadata and name suggestions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Fetch every published version of `name`.
    ///
    /// Returns `Ok(None)` when the registry reports the package does not exist.
    async fn fetch_package_info(&self, name: &str) -> Result<Option<RegistryEntry>, RegistryError>;

    /// Up to [`MAX_SUGGESTIONS`] existing package names resembling `name`.
    ///
    /// Best effort: any failure yields an empty list.
    async fn find_similar_packages(&self, name: &str) -> Vec<String>;
}
