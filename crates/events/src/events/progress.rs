use serde::{Deserialize, Serialize};

/// Progress of one job, as reported by the worker running it.
///
/// `Init` is always the first event of a job and exactly one of `Done` or
/// `Error` is the last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Stable id of the reporting worker
    pub worker: usize,
    /// Position of the job in the run's job list
    pub position: usize,
    pub package: String,
    pub kind: ProgressKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ProgressKind {
    Init,
    Downloading { done: u64, total: Option<u64> },
    Converting,
    Done,
    Error { message: String },
}

impl ProgressKind {
    /// Whether this event ends its job
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}
