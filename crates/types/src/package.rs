//! Declarative package specifications

use crate::meta::PackageMeta;
use crate::version::compare_versions;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// One upstream package as declared in the package set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSpec {
    /// Upstream artifact location
    pub url: String,
    /// Space-separated dependency patterns passed to the converter
    pub deps: String,
    pub not_deps: String,
    pub replaces: String,
    pub provides: String,
    /// Upstream version, preferred staleness criterion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Upstream modification time in seconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<u64>,
}

/// How to decide whether a built package is out of date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness<'a> {
    Version(&'a str),
    LastModified(u64),
    /// No criterion declared: the package is never considered stale
    Never,
}

/// Whether a record that declares it reverts the requested version counts
/// as newer than that version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertPolicy {
    TreatAsNewer,
    #[default]
    TreatAsOlder,
}

impl fmt::Display for RevertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TreatAsNewer => write!(f, "treat_as_newer"),
            Self::TreatAsOlder => write!(f, "treat_as_older"),
        }
    }
}

impl PackageSpec {
    /// The staleness criterion. `version` wins when both are declared.
    #[must_use]
    pub fn staleness(&self) -> Staleness<'_> {
        match (&self.version, self.last_modified) {
            (Some(version), _) => Staleness::Version(version),
            (None, Some(ts)) => Staleness::LastModified(ts),
            (None, None) => Staleness::Never,
        }
    }

    /// Whether `record` is older than what this spec asks for.
    ///
    /// A missing record is always stale.
    #[must_use]
    pub fn is_stale(&self, record: Option<&PackageMeta>, policy: RevertPolicy) -> bool {
        let Some(record) = record else {
            return true;
        };

        match self.staleness() {
            Staleness::Never => false,
            Staleness::Version(wanted) => {
                let Some(have) = record.version() else {
                    return true;
                };
                if compare_versions(wanted, have) != Ordering::Greater {
                    return false;
                }
                !(policy == RevertPolicy::TreatAsNewer && record.reverts_version(wanted))
            }
            Staleness::LastModified(ts) => match record.timestamp() {
                Some(built) => i64::try_from(ts).map_or(true, |ts| ts > built),
                None => true,
            },
        }
    }

    /// Iterate the whitespace-separated entries of `deps`.
    pub fn dep_patterns(&self) -> impl Iterator<Item = &str> {
        self.deps.split_whitespace()
    }
}

/// The immutable set of declared packages, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageSet {
    packages: BTreeMap<String, PackageSpec>,
}

impl PackageSet {
    #[must_use]
    pub fn new(packages: BTreeMap<String, PackageSpec>) -> Self {
        Self { packages }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PackageSpec> {
        self.packages.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageSpec)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, PackageSpec)> for PackageSet {
    fn from_iter<T: IntoIterator<Item = (String, PackageSpec)>>(iter: T) -> Self {
        Self {
            packages: iter.into_iter().collect(),
        }
    }
}
