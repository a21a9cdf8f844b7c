use serde::{Deserialize, Serialize};

use vpkg_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

pub mod acquisition;
pub mod general;
pub mod progress;
pub mod repository;
pub mod transaction;

pub use acquisition::*;
pub use general::*;
pub use progress::*;
pub use repository::*;
pub use transaction::*;

/// Top-level application event enum that aggregates all domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Warnings, errors, debug output
    General(GeneralEvent),

    /// Run-level scheduling: pool start, job enqueue, run end
    Acquisition(AcquisitionEvent),

    /// Per-job progress rows
    Progress(ProgressEvent),

    /// Index staging and commit
    Repository(RepositoryEvent),

    /// Transaction engine outcomes
    Transaction(TransactionEvent),
}

impl AppEvent {
    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. })
            | Self::Progress(ProgressEvent {
                kind: ProgressKind::Error { .. },
                ..
            })
            | Self::Acquisition(AcquisitionEvent::Failed { .. })
            | Self::Transaction(TransactionEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Repository(RepositoryEvent::CommitDeferred { .. }) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Progress(ProgressEvent {
                kind: ProgressKind::Downloading { .. },
                ..
            }) => Level::TRACE,

            Self::Progress(_) | Self::Acquisition(AcquisitionEvent::JobQueued { .. }) => {
                Level::DEBUG
            }

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "vpkg::events::general",
            Self::Acquisition(_) => "vpkg::events::acquisition",
            Self::Progress(_) => "vpkg::events::progress",
            Self::Repository(_) => "vpkg::events::repository",
            Self::Transaction(_) => "vpkg::events::transaction",
        }
    }
}
