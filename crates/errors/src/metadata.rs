//! Produced-package metadata error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum MetadataError {
    #[error("no package properties found in {path}")]
    MissingProperties { path: String },

    #[error("malformed package metadata in {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("package metadata is missing `{field}`")]
    MissingField { field: String },

    #[error("package {pkgver} has architecture {arch}, expected {expected}")]
    ArchMismatch {
        pkgver: String,
        arch: String,
        expected: String,
    },
}

impl UserFacingError for MetadataError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MissingProperties { .. } => "metadata.missing_properties",
            Self::Malformed { .. } => "metadata.malformed",
            Self::MissingField { .. } => "metadata.missing_field",
            Self::ArchMismatch { .. } => "metadata.arch_mismatch",
        };
        Some(code)
    }
}
