#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Local package repository for vpkg
//!
//! Keeps the committed index of built packages next to the archives, stages
//! packages built during a run, and merges the stage only when no shared
//! library consumer would be left without a provider.

mod digest;
mod flush;
mod index;
mod shlibs;

pub use digest::file_digest;
pub use flush::{write_atomic, FILE_MODE};
pub use index::{prepare_entry, CommitOutcome, RepositoryIndex};
pub use shlibs::broken_shlibs;
