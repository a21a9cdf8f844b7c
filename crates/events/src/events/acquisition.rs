use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Run-level events of the acquisition pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcquisitionEvent {
    /// The worker pool is up. Renderers size their progress block from
    /// `workers`.
    Started { workers: usize, jobs: usize },

    /// A job was appended to the job list
    JobQueued {
        package: String,
        position: usize,
        /// Package whose conversion declared this dependency
        required_by: Option<String>,
    },

    /// Every job settled and every worker has been joined
    Completed { built: usize, cached: usize },

    /// A job failed and the remaining workers were cancelled
    Failed {
        package: String,
        failure: FailureContext,
    },
}
