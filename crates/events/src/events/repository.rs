use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Events of the repository index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepositoryEvent {
    /// A built package entered the stage
    Staged { pkgver: String, arch: String },

    /// A staged package was merged into the committed index
    IndexAdded { pkgver: String, arch: String },

    /// The commit would have broken shared-library consumers. The stage was
    /// written to `stage_file` instead.
    CommitDeferred {
        broken: Vec<BrokenShlibInfo>,
        staged: Vec<(String, String)>,
        stage_file: PathBuf,
    },

    /// An index file was atomically replaced
    Flushed { path: PathBuf, packages: usize },
}

/// One shared library that would be left without a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenShlibInfo {
    pub shlib: String,
    pub provider: String,
    pub users: Vec<String>,
}
