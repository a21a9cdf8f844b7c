//! Package version ordering and dependency-pattern parsing
//!
//! Versions follow the xbps/NetBSD "dewey" rules:
//! - numeric runs compare numerically
//! - `alpha` < `beta` < `pre`/`rc` < release < `pl`
//! - a bare letter sorts after its numeric prefix (`1.0a` > `1.0`)
//! - `_N` is the package revision and is compared last

use std::cmp::Ordering;

const ALPHA: i64 = -3;
const BETA: i64 = -2;
const RC: i64 = -1;
const DOT: i64 = 0;

const MODIFIERS: &[(&str, i64)] = &[
    ("alpha", ALPHA),
    ("beta", BETA),
    ("pre", RC),
    ("rc", RC),
    ("pl", DOT),
];

/// A version string split into dewey components and a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Dewey {
    components: Vec<i64>,
    revision: i64,
}

impl Dewey {
    fn parse(version: &str) -> Self {
        let (body, revision) = match version.rsplit_once('_') {
            Some((body, rev)) if !rev.is_empty() && rev.bytes().all(|b| b.is_ascii_digit()) => {
                (body, rev.parse().unwrap_or(0))
            }
            _ => (version, 0),
        };

        let mut components = Vec::new();
        let mut rest = body;
        while let Some(c) = rest.chars().next() {
            if c.is_ascii_digit() {
                let end = rest
                    .find(|ch: char| !ch.is_ascii_digit())
                    .unwrap_or(rest.len());
                components.push(rest[..end].parse().unwrap_or(i64::MAX));
                rest = &rest[end..];
            } else if let Some((word, value)) = MODIFIERS
                .iter()
                .find(|(word, _)| rest.to_ascii_lowercase().starts_with(word))
            {
                components.push(*value);
                rest = &rest[word.len()..];
            } else if c.is_ascii_alphabetic() {
                components.push(DOT);
                components.push(i64::from(c.to_ascii_lowercase() as u8 - b'a' + 1));
                rest = &rest[1..];
            } else {
                if c == '.' {
                    components.push(DOT);
                }
                rest = &rest[c.len_utf8()..];
            }
        }

        Self {
            components,
            revision,
        }
    }
}

impl Ord for Dewey {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(DOT);
            let b = other.components.get(i).copied().unwrap_or(DOT);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        self.revision.cmp(&other.revision)
    }
}

impl PartialOrd for Dewey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two version strings, revisions included.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Dewey::parse(a).cmp(&Dewey::parse(b))
}

/// Split a `name-version_revision` string into its name and version.
///
/// Returns `None` when the string carries no version part.
#[must_use]
pub fn split_pkgver(pkgver: &str) -> Option<(&str, &str)> {
    let (name, version) = pkgver.rsplit_once('-')?;
    if name.is_empty() || version.is_empty() || !version.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((name, version))
}

/// Extract the package name from a dependency pattern.
///
/// Accepts constraint patterns (`foo>=1.0_1`, `foo<2`), glob patterns
/// (`foo-[0-9]*`), full package versions (`foo-1.0_1`) and bare names.
#[must_use]
pub fn pkgpattern_name(pattern: &str) -> Option<&str> {
    let pattern = pattern.trim();
    if pattern.is_empty() || pattern.contains(char::is_whitespace) {
        return None;
    }

    if let Some(idx) = pattern.find(['<', '>', '=']) {
        return non_empty(&pattern[..idx]);
    }
    if let Some(idx) = pattern.find(['*', '?', '[']) {
        return non_empty(pattern[..idx].trim_end_matches('-'));
    }
    if let Some((name, _)) = split_pkgver(pattern) {
        return Some(name);
    }
    Some(pattern)
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
