//! Snapshot of the packages the transaction engine reports as installed

use crate::meta::PackageMeta;
use std::collections::BTreeMap;

/// Installed package records keyed by package name.
///
/// Taken once before a run starts and never refreshed during it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstalledPackages {
    packages: BTreeMap<String, PackageMeta>,
}

impl InstalledPackages {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PackageMeta> {
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

    /// Installed packages that the converter produced, in name order
    pub fn converted(&self) -> impl Iterator<Item = &PackageMeta> {
        self.packages.values().filter(|meta| meta.is_converted())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageMeta)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<PackageMeta> for InstalledPackages {
    fn from_iter<T: IntoIterator<Item = PackageMeta>>(iter: T) -> Self {
        Self {
            packages: iter
                .into_iter()
                .map(|meta| (meta.name().to_string(), meta))
                .collect(),
        }
    }
}
