use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Events of the transaction phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionEvent {
    /// A package was handed to the engine
    Submitted { pkgver: String, update: bool },

    /// The engine reported the package as already installed
    AlreadyInstalled { pkgver: String },

    /// The prepared plan was empty
    NothingToDo,

    /// Planned changes, as `(name, version)` pairs
    Summary { changes: Vec<(String, String)> },

    Committed { changes: usize },

    Failed {
        operation: String,
        failure: FailureContext,
    },
}
