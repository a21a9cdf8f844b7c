#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations for vpkg
//!
//! This crate is the orchestration layer between the CLI and the pipeline
//! crates. `sync` drives a whole install or update: it picks the packages
//! that need work, runs the acquisition pipeline, commits the local
//! repository and hands the result to a [`TransactionEngine`].

mod context;
mod engine;
mod query;
mod sync;
mod types;
mod xbps;

pub use context::{AssumeYes, OpsContextBuilder, OpsCtx, Prompter};
pub use engine::{PlannedChange, PrepareOutcome, SubmitOutcome, TransactionEngine};
pub use query::{list_installed, list_package_set};
pub use sync::{scan_stale, sync};
pub use types::{IndexOutcome, ListEntry, SyncReport, SyncRequest, TransactionOutcome};
pub use xbps::XbpsEngine;

use serde::Serialize;
use vpkg_errors::{ConfigError, Error};

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    /// Converted packages installed on the system
    PackageList(Vec<ListEntry>),
    /// The package set with installed versions
    PackageSet(Vec<ListEntry>),
    SyncReport(SyncReport),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be serialized.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializeError {
                error: e.to_string(),
            }
            .into()
        })
    }
}
