//! Converter subprocess error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConversionError {
    /// The converter exited with a nonzero status. `stderr` is already
    /// trimmed of trailing newlines.
    #[error("xdeb failed with {code}:\n{stderr}")]
    Failed { code: i32, stderr: String },

    #[error("xdeb was terminated by a signal:\n{stderr}")]
    Terminated { stderr: String },

    #[error("xdeb produced no package path ({output:?}):\n{stderr}")]
    InvalidOutput { output: String, stderr: String },

    #[error("failed to spawn {program}: {message}")]
    SpawnFailed { program: String, message: String },
}

impl ConversionError {
    /// Build a failure from a raw exit code and the captured standard error.
    #[must_use]
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self::Failed {
            code,
            stderr: stderr.trim_end_matches(['\n', '\r']).to_string(),
        }
    }
}

impl UserFacingError for ConversionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SpawnFailed { .. } => {
                Some("Install xdeb or point converter.program at its location.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Failed { .. } => "conversion.failed",
            Self::Terminated { .. } => "conversion.terminated",
            Self::InvalidOutput { .. } => "conversion.invalid_output",
            Self::SpawnFailed { .. } => "conversion.spawn_failed",
        };
        Some(code)
    }
}
