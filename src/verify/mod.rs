//! Dependency verification against a package registry.
//!
//! - [`similarity`]: normalized Levenshtein score between names
//! - [`version`]: range-operator handling and closest-version lookup
//! - [`verifier`]: the per-dependency pipeline and fix-map construction

pub mod similarity;
pub mod verifier;
pub mod version;

pub use similarity::similarity;
pub use verifier::{
    DEFAULT_CONCURRENCY, DependencyKind, DependencySpec, DependencyVerifier, FixMap, FixPolicy,
    Verification, VerificationResult,
};
pub use version::{VersionMatchError, find_closest_version};
