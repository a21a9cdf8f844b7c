//! Transaction engine error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TransactionError {
    #[error("{pkgver}: Not found in repository pool")]
    NotFound { pkgver: String },

    #[error("Missing dependencies")]
    MissingDependencies,

    #[error("{operation} failed with {code}: {message}")]
    Engine {
        operation: String,
        code: i32,
        message: String,
    },

    #[error("transaction aborted by user")]
    Aborted,
}

impl UserFacingError for TransactionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingDependencies => {
                Some("Add the missing packages to your package set or enable their repository.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "transaction.not_found",
            Self::MissingDependencies => "transaction.missing_dependencies",
            Self::Engine { .. } => "transaction.engine",
            Self::Aborted => "transaction.aborted",
        };
        Some(code)
    }
}
