//! npm registry implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Url;
use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::http::HttpClient;

use super::search::NpmSearch;
use super::{PackageRegistry, RegistryEntry, RegistryError};

/// Default base URL for the public npm registry.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// The part of a packument we care about.
#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(default)]
    versions: BTreeMap<String, IgnoredAny>,
}

/// Registry backed by the npm HTTP API, with `npm search` for suggestions.
pub struct NpmRegistry {
    http: HttpClient,
    base_url: String,
    search: NpmSearch,
}

impl NpmRegistry {
    pub fn new(http: HttpClient, base_url: &str, search: NpmSearch) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            search,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/<name>` with the name percent-encoded as one path segment.
    ///
    /// Scoped names keep the `@` and escape the separator: `@scope/name`
    /// becomes `@scope%2Fname`. `?`, `#` and `%` are escaped too, so a name
    /// can never turn into a query or fragment.
    fn package_url(&self, package_name: &str) -> Result<Url, RegistryError> {
        let invalid = || RegistryError::InvalidUrl(self.base_url.clone());

        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(package_name);
        Ok(url)
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    #[tracing::instrument(skip(self))]
    async fn fetch_package_info(
        &self,
        package_name: &str,
    ) -> Result<Option<RegistryEntry>, RegistryError> {
        let url = self.package_url(package_name)?;

        let document = self
            .http
            .get_json_optional::<PackageDocument>(url.as_str())
            .await
            .map_err(|e| {
                let error = RegistryError::from(e);
                warn!("Lookup of {} failed: {}", package_name, error);
                error
            })?;

        let Some(document) = document else {
            debug!("{} is not published", package_name);
            return Ok(None);
        };

        debug!(
            "{} has {} published version(s)",
            package_name,
            document.versions.len()
        );

        Ok(Some(RegistryEntry::new(
            package_name,
            document.versions.into_keys(),
        )))
    }

    #[tracing::instrument(skip(self))]
    async fn find_similar_packages(&self, package_name: &str) -> Vec<String> {
        self.search.search(package_name).await
    }
}
