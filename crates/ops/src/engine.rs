//! The transaction engine seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vpkg_errors::Error;
use vpkg_types::InstalledPackages;

/// Result of handing one package to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Success,
    AlreadySatisfied,
    NotFound,
    MissingDependency,
    Other(i32),
}

/// One line of a prepared plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedChange {
    pub name: String,
    pub version: String,
}

/// Result of preparing the submitted packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareOutcome {
    /// The plan, empty when nothing needs to change
    Success(Vec<PlannedChange>),
    MissingDependency,
    Other(i32),
}

/// External package manager that installs what the pipeline built.
///
/// Packages are submitted one at a time, then the whole transaction is
/// prepared and committed.
#[async_trait]
pub trait TransactionEngine: Send + Sync {
    /// Snapshot of the installed package database
    async fn installed(&self) -> Result<InstalledPackages, Error>;

    /// Make freshly built archives visible to the engine's repository pool
    async fn register(&mut self, archives: &[PathBuf]) -> Result<(), Error>;

    async fn install(&mut self, pkgver: &str, force: bool) -> Result<SubmitOutcome, Error>;

    async fn update(&mut self, pkgver: &str) -> Result<SubmitOutcome, Error>;

    async fn prepare(&mut self) -> Result<PrepareOutcome, Error>;

    /// Apply the prepared plan
    async fn commit(&mut self) -> Result<(), Error>;
}
