//! Package-set loading
//!
//! The package set is a TOML document with one table per package:
//!
//! ```toml
//! [discord]
//! url = "https://dl.discordapp.net/apps/linux/0.0.40/discord-0.0.40.deb"
//! deps = "libatomic>=0"
//! version = "0.0.40"
//! ```

use std::path::Path;
use tokio::fs;
use vpkg_errors::{ConfigError, Error};
use vpkg_types::{PackageSet, Staleness};

/// Load and parse a package set
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid package set.
pub async fn load_package_set(path: &Path) -> Result<PackageSet, Error> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|_| ConfigError::NotFound {
            path: path.display().to_string(),
        })?;

    let set = parse_package_set(&contents)?;
    tracing::debug!(path = %path.display(), packages = set.len(), "loaded package set");
    Ok(set)
}

/// Parse a package set from TOML text
///
/// # Errors
///
/// Returns an error on invalid TOML or an invalid package name.
pub fn parse_package_set(contents: &str) -> Result<PackageSet, Error> {
    let set: PackageSet = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;

    for (name, spec) in set.iter() {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "package name".to_string(),
                value: name.to_string(),
            }
            .into());
        }
        if spec.staleness() == Staleness::Never {
            tracing::warn!(package = name, "no version or last_modified, package will never update");
        }
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_set() {
        let set = parse_package_set(
            r#"
            [slack]
            url = "https://example.com/slack.deb"
            not_deps = "libappindicator3-1"
            provides = "slack-desktop-1.0_1"
            last_modified = 1690000000
            "#,
        )
        .unwrap();
        let slack = set.get("slack").unwrap();
        assert_eq!(slack.not_deps, "libappindicator3-1");
        assert_eq!(slack.provides, "slack-desktop-1.0_1");
        assert_eq!(slack.last_modified, Some(1_690_000_000));
        assert!(slack.deps.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(parse_package_set("[slack\nurl=").is_err());
    }

    #[test]
    fn test_negative_last_modified_rejected() {
        assert!(parse_package_set("[a]\nlast_modified = -1\n").is_err());
    }
}
