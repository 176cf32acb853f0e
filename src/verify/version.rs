//! Closest-version lookup over a registry's published versions.
//!
//! Versions are compared as three numeric components (major, minor, patch).
//! A missing or non-numeric component counts as `0`; prerelease tags and
//! build metadata are not interpreted.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// Weight applied per component when measuring distance: major, minor, patch.
const COMPONENT_WEIGHTS: [u64; 3] = [1_000_000, 1_000, 1];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionMatchError {
    #[error("no published versions to match '{requested}' against")]
    NoVersionsAvailable { requested: String },
}

/// Leading operator of a requested range such as `^1.2.0` or `>=2.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOperator {
    Caret,
    Tilde,
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    Less,
}

impl RangeOperator {
    // Two-character operators must be tried before their one-character prefixes.
    const ALL: [RangeOperator; 6] = [
        RangeOperator::GreaterOrEqual,
        RangeOperator::LessOrEqual,
        RangeOperator::Caret,
        RangeOperator::Tilde,
        RangeOperator::Greater,
        RangeOperator::Less,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RangeOperator::Caret => "^",
            RangeOperator::Tilde => "~",
            RangeOperator::GreaterOrEqual => ">=",
            RangeOperator::LessOrEqual => "<=",
            RangeOperator::Greater => ">",
            RangeOperator::Less => "<",
        }
    }

    /// Whether `candidate` lies on the side of `target` this operator asks for.
    fn accepts(self, target: VersionKey, candidate: VersionKey) -> bool {
        let [major, minor, _] = target.0;
        match self {
            RangeOperator::Caret => candidate.0[0] == major && candidate >= target,
            RangeOperator::Tilde => {
                candidate.0[0] == major && candidate.0[1] == minor && candidate >= target
            }
            RangeOperator::GreaterOrEqual => candidate >= target,
            RangeOperator::Greater => candidate > target,
            RangeOperator::LessOrEqual => candidate <= target,
            RangeOperator::Less => candidate < target,
        }
    }
}

impl fmt::Display for RangeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a requested range into its leading operator and the bare version.
///
/// ```
/// use nph::verify::version::{split_range, RangeOperator};
///
/// assert_eq!(split_range(">=1.2.0"), (Some(RangeOperator::GreaterOrEqual), "1.2.0"));
/// assert_eq!(split_range("1.2.0"), (None, "1.2.0"));
/// ```
pub fn split_range(requested: &str) -> (Option<RangeOperator>, &str) {
    let requested = requested.trim();
    for op in RangeOperator::ALL {
        if let Some(rest) = requested.strip_prefix(op.as_str()) {
            return (Some(op), rest.trim_start());
        }
    }
    (None, requested)
}

/// The requested range without its leading operator.
pub fn strip_range_operator(requested: &str) -> &str {
    split_range(requested).1
}

/// The requested range's leading operator, or `""` when there is none.
pub fn range_prefix(requested: &str) -> &'static str {
    split_range(requested).0.map(RangeOperator::as_str).unwrap_or("")
}

/// Numeric (major, minor, patch) form of a version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionKey([u64; 3]);

impl VersionKey {
    pub fn parse(version: &str) -> Self {
        let mut parts = [0u64; 3];
        for (slot, component) in parts.iter_mut().zip(version.trim().split('.')) {
            *slot = component.parse().unwrap_or(0);
        }
        VersionKey(parts)
    }

    /// Weighted component-wise distance; major differences dominate.
    pub fn distance(self, other: VersionKey) -> u64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .zip(COMPONENT_WEIGHTS.iter())
            .fold(0u64, |acc, ((a, b), weight)| {
                acc.saturating_add(a.abs_diff(*b).saturating_mul(*weight))
            })
    }
}

/// Orders versions newest first. Equal keys keep their input order.
pub fn sort_latest_first<'a, I>(versions: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut sorted: Vec<&str> = versions.into_iter().map(String::as_str).collect();
    sorted.sort_by_key(|v| Reverse(VersionKey::parse(v)));
    sorted
}

/// Finds the published version closest to `requested`.
///
/// An exact match of the operator-stripped version is returned unchanged.
/// Otherwise candidates accepted by the range operator are preferred, and a
/// request newer than every published version resolves to the latest one.
/// Remaining ties go to the newest candidate.
#[tracing::instrument(skip(available))]
pub fn find_closest_version(
    available: &BTreeSet<String>,
    requested: &str,
) -> Result<String, VersionMatchError> {
    let (operator, clean_target) = split_range(requested);

    if available.contains(clean_target) {
        return Ok(clean_target.to_string());
    }

    let sorted = sort_latest_first(available);
    let Some(latest) = sorted.first().copied() else {
        return Err(VersionMatchError::NoVersionsAvailable {
            requested: requested.to_string(),
        });
    };

    let target = VersionKey::parse(clean_target);
    if target > VersionKey::parse(latest) {
        return Ok(latest.to_string());
    }

    let compatible: Vec<&str> = match operator {
        Some(op) => sorted
            .iter()
            .copied()
            .filter(|v| op.accepts(target, VersionKey::parse(v)))
            .collect(),
        None => Vec::new(),
    };
    let candidates = if compatible.is_empty() {
        &sorted
    } else {
        &compatible
    };

    // min_by_key keeps the first minimum, i.e. the newest on ties.
    let closest = candidates
        .iter()
        .copied()
        .min_by_key(|v| target.distance(VersionKey::parse(v)))
        .unwrap_or(latest);

    Ok(closest.to_string())
}
