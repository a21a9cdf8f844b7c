//! Types for operations and results

use crate::engine::PlannedChange;
use serde::{Deserialize, Serialize};

/// What to synchronize
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Package names. In update mode an empty list means every stale
    /// converted package on the system.
    pub packages: Vec<String>,
    pub update: bool,
    /// Rebuild and reinstall even when nothing is stale
    pub force: bool,
}

impl SyncRequest {
    #[must_use]
    pub fn install(packages: Vec<String>, force: bool) -> Self {
        Self {
            packages,
            update: false,
            force,
        }
    }

    #[must_use]
    pub fn update(force: bool) -> Self {
        Self {
            packages: Vec::new(),
            update: true,
            force,
        }
    }

    /// Whether the candidates come from a scan of the installed packages
    #[must_use]
    pub fn is_scan(&self) -> bool {
        self.update && self.packages.is_empty()
    }
}

/// How the index commit ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexOutcome {
    Unchanged,
    Committed { added: Vec<String> },
    Deferred { staged: Vec<String>, broken: usize },
}

/// How the transaction phase ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionOutcome {
    NothingToDo,
    Committed { changes: Vec<PlannedChange> },
}

/// Report of a complete sync
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncReport {
    /// Packages the run was seeded with
    pub candidates: Vec<String>,
    /// Every processed job, seeded ones first
    pub jobs: Vec<String>,
    pub built: usize,
    pub cached: usize,
    pub index: IndexOutcome,
    /// Packages handed to the engine
    pub submitted: Vec<String>,
    pub transaction: TransactionOutcome,
}

impl SyncReport {
    pub(crate) fn nothing_to_do(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            jobs: Vec::new(),
            built: 0,
            cached: 0,
            index: IndexOutcome::Unchanged,
            submitted: Vec::new(),
            transaction: TransactionOutcome::NothingToDo,
        }
    }
}

/// One line of `vpkg list`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    /// Installed version string, when installed
    pub pkgver: Option<String>,
}

impl ListEntry {
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.pkgver.is_some()
    }
}
