#![warn(clippy::pedantic)]
#![deny(clippy::all)]

//! Concurrent package acquisition for vpkg
//!
//! A fixed pool of workers claims jobs from a growing job list. Each job
//! either reuses the repository's record for its package or fetches,
//! converts and stages it, then queues the declared packages it depends on.

mod context;
mod scheduler;

pub use context::SyncContext;
pub use scheduler::{JobResult, RunReport, Scheduler, SchedulerConfig, SharedIndex};

// Re-exported for callers wiring a scheduler to a renderer
pub use vpkg_events::EventSender;
