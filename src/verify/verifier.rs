use std::collections::HashSet;
use std::fmt;

use futures_util::stream::{self, StreamExt};
use indexmap::IndexMap;
use log::{debug, warn};

use crate::registry::PackageRegistry;

use super::version::{find_closest_version, range_prefix, strip_range_operator};

/// Registry lookups allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Which manifest table a dependency is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Regular,
    Dev,
}

impl DependencyKind {
    /// The manifest key holding this kind of dependency.
    pub fn manifest_key(self) -> &'static str {
        match self {
            DependencyKind::Regular => "dependencies",
            DependencyKind::Dev => "devDependencies",
        }
    }
}

/// One declared dependency, as read from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub requested_range: String,
    pub kind: DependencyKind,
}

impl DependencySpec {
    pub fn new(name: &str, requested_range: &str, kind: DependencyKind) -> Self {
        Self {
            name: name.to_string(),
            requested_range: requested_range.to_string(),
            kind,
        }
    }

    pub fn is_dev(&self) -> bool {
        self.kind == DependencyKind::Dev
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.requested_range)
    }
}

/// Outcome of checking one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Ok(DependencySpec),
    PackageNotFound {
        spec: DependencySpec,
        suggestion: Option<String>,
    },
    VersionNotFound {
        spec: DependencySpec,
        /// Closest published version, carrying the original range operator.
        closest_version: String,
    },
    TransientError {
        spec: DependencySpec,
        message: String,
    },
}

impl VerificationResult {
    pub fn spec(&self) -> &DependencySpec {
        match self {
            VerificationResult::Ok(spec)
            | VerificationResult::PackageNotFound { spec, .. }
            | VerificationResult::VersionNotFound { spec, .. }
            | VerificationResult::TransientError { spec, .. } => spec,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationResult::Ok(_))
    }
}

/// Which kinds of problems get corrected in the fix map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixPolicy {
    #[default]
    None,
    FixNameOnly,
    FixVersionOnly,
    FixAll,
}

impl FixPolicy {
    /// Maps the `--fix-all`, `--fix-version` and `--fix-name` flags.
    /// Asking for both names and versions is the same as asking for all.
    pub fn from_flags(fix_all: bool, fix_version: bool, fix_name: bool) -> Self {
        match (fix_all, fix_version, fix_name) {
            (true, _, _) | (false, true, true) => FixPolicy::FixAll,
            (false, true, false) => FixPolicy::FixVersionOnly,
            (false, false, true) => FixPolicy::FixNameOnly,
            (false, false, false) => FixPolicy::None,
        }
    }

    pub fn fixes_names(self) -> bool {
        matches!(self, FixPolicy::FixAll | FixPolicy::FixNameOnly)
    }

    pub fn fixes_versions(self) -> bool {
        matches!(self, FixPolicy::FixAll | FixPolicy::FixVersionOnly)
    }

    pub fn is_none(self) -> bool {
        self == FixPolicy::None
    }
}

/// Replacement dependency tables, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixMap {
    pub dependencies: IndexMap<String, String>,
    pub dev_dependencies: IndexMap<String, String>,
}

impl FixMap {
    /// Builds the fix map from verification results alone; no lookups happen here.
    ///
    /// A rename never lands on a name that is already declared in either table
    /// or already taken by an earlier rename; the original entry is kept instead.
    pub fn build(results: &[VerificationResult], policy: FixPolicy) -> Self {
        let declared: HashSet<&str> = results
            .iter()
            .map(|result| result.spec().name.as_str())
            .collect();
        let mut fix_map = FixMap::default();
        for result in results {
            let spec = result.spec();
            let (name, range) = match result {
                VerificationResult::PackageNotFound {
                    suggestion: Some(suggestion),
                    ..
                } if policy.fixes_names() => {
                    if declared.contains(suggestion.as_str())
                        || fix_map.table(spec.kind).contains_key(suggestion)
                    {
                        warn!(
                            "Not renaming {} to {}: {} is already declared",
                            spec.name, suggestion, suggestion
                        );
                        (spec.name.as_str(), spec.requested_range.as_str())
                    } else {
                        (suggestion.as_str(), spec.requested_range.as_str())
                    }
                }
                VerificationResult::VersionNotFound {
                    closest_version, ..
                } if policy.fixes_versions() => (spec.name.as_str(), closest_version.as_str()),
                _ => (spec.name.as_str(), spec.requested_range.as_str()),
            };
            fix_map
                .table_mut(spec.kind)
                .insert(name.to_string(), range.to_string());
        }
        fix_map
    }

    pub fn table(&self, kind: DependencyKind) -> &IndexMap<String, String> {
        match kind {
            DependencyKind::Regular => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
        }
    }

    fn table_mut(&mut self, kind: DependencyKind) -> &mut IndexMap<String, String> {
        match kind {
            DependencyKind::Regular => &mut self.dependencies,
            DependencyKind::Dev => &mut self.dev_dependencies,
        }
    }
}

/// Results of a full pass plus the fix map they imply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub results: Vec<VerificationResult>,
    pub fix_map: FixMap,
    pub policy: FixPolicy,
}

impl Verification {
    pub fn issue_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_ok()).count()
    }

    pub fn has_issues(&self) -> bool {
        self.issue_count() > 0
    }

    /// Whether the fix map should replace the manifest's dependency tables.
    pub fn should_write(&self) -> bool {
        !self.policy.is_none() && self.has_issues()
    }
}

/// Checks declared dependencies against a registry.
pub struct DependencyVerifier<P: PackageRegistry> {
    registry: P,
    concurrency: usize,
}

impl<P: PackageRegistry> DependencyVerifier<P> {
    pub fn new(registry: P) -> Self {
        Self {
            registry,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bounds concurrent lookups; values below one are raised to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn registry(&self) -> &P {
        &self.registry
    }

    /// Checks every dependency and builds the fix map for `policy`.
    ///
    /// Results come back in input order regardless of which lookup finishes
    /// first.
    #[tracing::instrument(skip(self, deps), fields(count = deps.len()))]
    pub async fn verify(&self, deps: &[DependencySpec], policy: FixPolicy) -> Verification {
        let results: Vec<VerificationResult> = stream::iter(deps)
            .map(|spec| self.check(spec))
            .buffered(self.concurrency)
            .collect()
            .await;

        let fix_map = FixMap::build(&results, policy);
        Verification {
            results,
            fix_map,
            policy,
        }
    }

    /// Fetch, then either suggest a name or check the version.
    #[tracing::instrument(skip(self), fields(package = %spec))]
    pub async fn check(&self, spec: &DependencySpec) -> VerificationResult {
        let entry = match self.registry.fetch_package_info(&spec.name).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Could not verify {}: {}", spec, e);
                return VerificationResult::TransientError {
                    spec: spec.clone(),
                    message: e.to_string(),
                };
            }
        };

        let Some(entry) = entry else {
            let suggestion = self
                .registry
                .find_similar_packages(&spec.name)
                .await
                .into_iter()
                .next();
            debug!("{} does not exist, suggestion: {:?}", spec.name, suggestion);
            return VerificationResult::PackageNotFound {
                spec: spec.clone(),
                suggestion,
            };
        };

        if entry.has_version(strip_range_operator(&spec.requested_range)) {
            return VerificationResult::Ok(spec.clone());
        }

        match find_closest_version(&entry.versions, &spec.requested_range) {
            Ok(closest) => VerificationResult::VersionNotFound {
                spec: spec.clone(),
                closest_version: format!("{}{}", range_prefix(&spec.requested_range), closest),
            },
            Err(e) => VerificationResult::TransientError {
                spec: spec.clone(),
                message: e.to_string(),
            },
        }
    }
}
