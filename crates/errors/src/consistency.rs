//! Shared-library consistency error types

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

/// A shared library that would lose its provider if the stage were merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenShlib {
    pub shlib: String,
    pub provider: String,
    pub users: Vec<String>,
}

impl fmt::Display for BrokenShlib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (provided by: {}; used by: {})",
            self.shlib,
            self.provider,
            self.users.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConsistencyError {
    #[error("inconsistent shlibs: {}", format_shlibs(.shlibs))]
    BrokenShlibs { shlibs: Vec<BrokenShlib> },
}

fn format_shlibs(shlibs: &[BrokenShlib]) -> String {
    shlibs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl UserFacingError for ConsistencyError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("Rebuild the consumers listed above, then run the update again.")
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::BrokenShlibs { .. } => Some("consistency.broken_shlibs"),
        }
    }
}
