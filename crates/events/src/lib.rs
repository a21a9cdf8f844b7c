#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for vpkg
//!
//! Workers never print. Everything a run wants to show the user travels as
//! an [`AppEvent`] over an unbounded channel to a single consumer, which
//! renders progress rows and forwards the rest to `tracing`.
//!
//! Events from one sender arrive in the order they were sent. There is no
//! ordering across senders.

pub mod events;
pub use events::{
    AcquisitionEvent, AppEvent, BrokenShlibInfo, FailureContext, GeneralEvent, ProgressEvent,
    ProgressKind, RepositoryEvent, TransactionEvent,
};

use tokio::sync::mpsc::UnboundedSender;

/// Sending half of the progress channel
pub type EventSender = UnboundedSender<AppEvent>;

/// Receiving half of the progress channel
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implemented by anything that may hold a sender. A dropped receiver is
/// never an error for the emitter.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit a progress event for one job
    fn emit_progress(&self, worker: usize, position: usize, package: &str, kind: ProgressKind) {
        self.emit(AppEvent::Progress(ProgressEvent {
            worker,
            position,
            package: package.to_string(),
            kind,
        }));
    }

    /// Emit a repository event
    fn emit_repository(&self, event: RepositoryEvent) {
        self.emit(AppEvent::Repository(event));
    }

    /// Emit a transaction event
    fn emit_transaction(&self, event: TransactionEvent) {
        self.emit(AppEvent::Transaction(event));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
