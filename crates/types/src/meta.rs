//! Package metadata records as stored in the repository index

use crate::version::{compare_versions, split_pkgver};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Keys that the converter writes but the index never keeps
pub const STRIPPED_KEYS: &[&str] = &["pkgname", "version", "packaged-with"];

/// Metadata for one built package.
///
/// The well-known keys are typed; anything else the converter records is
/// preserved verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMeta {
    pub pkgver: String,
    pub architecture: String,
    #[serde(rename = "shlib-provides", default, skip_serializing_if = "Vec::is_empty")]
    pub shlib_provides: Vec<String>,
    #[serde(rename = "shlib-requires", default, skip_serializing_if = "Vec::is_empty")]
    pub shlib_requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run_depends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reverts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(rename = "filename-sha256", default, skip_serializing_if = "Option::is_none")]
    pub filename_hash: Option<String>,
    #[serde(rename = "filename-size", default, skip_serializing_if = "Option::is_none")]
    pub filename_size: Option<u64>,
    #[serde(rename = "build-date", default, skip_serializing_if = "Option::is_none")]
    pub build_date: Option<String>,
    #[serde(rename = "install-date", default, skip_serializing_if = "Option::is_none")]
    pub install_date: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PackageMeta {
    /// Package name derived from `pkgver`
    #[must_use]
    pub fn name(&self) -> &str {
        split_pkgver(&self.pkgver).map_or(self.pkgver.as_str(), |(name, _)| name)
    }

    /// Version (with revision) derived from `pkgver`
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        split_pkgver(&self.pkgver).map(|(_, version)| version)
    }

    /// Whether the converter tagged this package as its own output
    #[must_use]
    pub fn is_converted(&self) -> bool {
        self.tags.as_deref() == Some(crate::CONVERTER_TAG)
    }

    /// Whether this record declares that it reverts `version`
    #[must_use]
    pub fn reverts_version(&self, version: &str) -> bool {
        let wanted = strip_revision(version);
        self.reverts
            .iter()
            .any(|r| compare_versions(strip_revision(r), wanted) == Ordering::Equal)
    }

    /// Build timestamp, falling back to the install timestamp, in seconds
    /// since the epoch
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        self.build_date
            .as_deref()
            .or(self.install_date.as_deref())
            .and_then(parse_date)
    }

    /// Drop the keys the index does not store
    pub fn strip_transient_keys(&mut self) {
        for key in STRIPPED_KEYS {
            self.extra.remove(*key);
        }
    }
}

fn strip_revision(version: &str) -> &str {
    match version.rsplit_once('_') {
        Some((body, rev)) if rev.bytes().all(|b| b.is_ascii_digit()) => body,
        _ => version,
    }
}

/// Parse the date formats package databases write (`%Y-%m-%d %H:%M %Z`,
/// with or without the zone, or RFC 3339).
fn parse_date(date: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.timestamp());
    }
    let trimmed = date
        .rsplit_once(' ')
        .filter(|(_, zone)| zone.chars().all(|c| c.is_ascii_alphabetic()))
        .map_or(date, |(rest, _)| rest);
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_keys_are_preserved() {
        let meta: PackageMeta = serde_json::from_value(json!({
            "pkgver": "foo-1.0_1",
            "architecture": "noarch",
            "short_desc": "a thing",
            "packaged-with": "xdeb",
        }))
        .unwrap();
        assert_eq!(meta.name(), "foo");
        assert_eq!(meta.version(), Some("1.0_1"));
        assert_eq!(meta.extra["short_desc"], json!("a thing"));

        let mut meta = meta;
        meta.strip_transient_keys();
        assert!(!meta.extra.contains_key("packaged-with"));
        assert!(meta.extra.contains_key("short_desc"));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("1970-01-01 00:01 UTC"), Some(60));
        assert_eq!(parse_date("1970-01-01 00:01"), Some(60));
        assert_eq!(parse_date("1970-01-01T00:01:00Z"), Some(60));
        assert_eq!(parse_date("yesterday"), None);
    }
}
