//! Event handling and progress display

use crate::display::ProgressDisplay;
use crate::logging::log_event;
use console::{style, Term};
use std::sync::{Arc, Mutex, PoisonError};
use vpkg_events::{
    AcquisitionEvent, AppEvent, BrokenShlibInfo, EventReceiver, GeneralEvent, RepositoryEvent,
    TransactionEvent,
};

/// Event handler for progress display and user feedback
pub struct EventHandler {
    /// Machine-readable output: nothing but the final result goes to stdout
    json: bool,
    /// Whether stdout is a terminal the progress block can redraw on
    interactive: bool,
    colors: bool,
    display: Option<ProgressDisplay<Term>>,
}

impl EventHandler {
    pub fn new(json: bool, interactive: bool, colors: bool) -> Self {
        Self {
            json,
            interactive,
            colors,
            display: None,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event(&event);
        if self.json {
            return;
        }

        match event {
            AppEvent::Acquisition(AcquisitionEvent::Started { workers, .. }) => {
                self.display = Some(ProgressDisplay::new(
                    workers,
                    Term::buffered_stdout(),
                    self.interactive,
                    self.colors,
                ));
            }
            AppEvent::Acquisition(
                AcquisitionEvent::Completed { .. } | AcquisitionEvent::Failed { .. },
            ) => {
                self.flush();
                self.display = None;
            }
            AppEvent::Progress(progress) => {
                if let Some(display) = self.display.as_mut() {
                    display.apply(&progress);
                }
            }
            AppEvent::Repository(event) => show_repository(event),
            AppEvent::Transaction(event) => show_transaction(event),
            AppEvent::General(GeneralEvent::Warning { message }) => self.show_warning(&message),
            AppEvent::General(GeneralEvent::Error { message }) => self.show_error(&message),
            AppEvent::General(GeneralEvent::DebugLog { .. })
            | AppEvent::Acquisition(AcquisitionEvent::JobQueued { .. }) => {}
        }
    }

    /// Redraw the progress block after a batch of events
    pub fn flush(&mut self) {
        if let Some(display) = self.display.as_mut() {
            if let Err(e) = display.redraw() {
                tracing::debug!(error = %e, "progress redraw failed");
            }
        }
    }

    fn show_warning(&self, message: &str) {
        if self.colors {
            eprintln!("{} {message}", style("warning:").yellow().bold());
        } else {
            eprintln!("warning: {message}");
        }
    }

    fn show_error(&self, message: &str) {
        if self.colors {
            eprintln!("{} {message}", style("error:").red().bold());
        } else {
            eprintln!("error: {message}");
        }
    }
}

fn show_repository(event: RepositoryEvent) {
    match event {
        RepositoryEvent::CommitDeferred { broken, staged, .. } => {
            println!("Inconsistent shlibs:");
            for info in &broken {
                println!("{}", format_broken_shlib(info));
            }
            for (pkgver, arch) in &staged {
                println!("stage: added `{pkgver}' ({arch})");
            }
        }
        RepositoryEvent::IndexAdded { pkgver, arch } => {
            println!("index: added `{pkgver}' ({arch}).");
        }
        RepositoryEvent::Staged { .. } | RepositoryEvent::Flushed { .. } => {}
    }
}

/// Failures are left to the final error report
fn show_transaction(event: TransactionEvent) {
    match event {
        TransactionEvent::AlreadyInstalled { pkgver } => {
            println!("{pkgver}: Already installed");
        }
        TransactionEvent::NothingToDo => println!("Nothing to do."),
        TransactionEvent::Submitted { .. }
        | TransactionEvent::Summary { .. }
        | TransactionEvent::Committed { .. }
        | TransactionEvent::Failed { .. } => {}
    }
}

fn format_broken_shlib(info: &BrokenShlibInfo) -> String {
    format!(
        "  {} (provided by: {}; used by: {})",
        info.shlib,
        info.provider,
        info.users.join(", ")
    )
}

/// The event receiver and its handler, shared between the command loop
/// and anything that must bring the screen up to date before it writes
/// to the terminal itself.
pub struct EventPump {
    receiver: EventReceiver,
    handler: EventHandler,
}

pub type SharedPump = Arc<Mutex<EventPump>>;

impl EventPump {
    pub fn shared(receiver: EventReceiver, handler: EventHandler) -> SharedPump {
        Arc::new(Mutex::new(Self { receiver, handler }))
    }

    /// Handle every queued event, then redraw once
    pub fn drain(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            self.handler.handle_event(event);
        }
        self.handler.flush();
    }
}

/// Drain a shared pump
pub fn drain(pump: &SharedPump) {
    pump.lock().unwrap_or_else(PoisonError::into_inner).drain();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_shlib_line() {
        let info = BrokenShlibInfo {
            shlib: "libfoo.so.1".to_string(),
            provider: "foo-1.0_1".to_string(),
            users: vec!["bar-2.0_1".to_string(), "baz-0.3_2".to_string()],
        };
        assert_eq!(
            format_broken_shlib(&info),
            "  libfoo.so.1 (provided by: foo-1.0_1; used by: bar-2.0_1, baz-0.3_2)"
        );
    }

    #[tokio::test]
    async fn drain_empties_the_channel() {
        let (tx, rx) = vpkg_events::channel();
        let pump = EventPump::shared(rx, EventHandler::new(true, false, false));
        tx.send(AppEvent::General(GeneralEvent::debug("one"))).unwrap();
        tx.send(AppEvent::General(GeneralEvent::debug("two"))).unwrap();

        drain(&pump);
        assert!(pump.lock().unwrap().receiver.try_recv().is_err());
    }
}
