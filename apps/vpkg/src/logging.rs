//! Tracing setup and event forwarding
//!
//! Every event that reaches the CLI is also written to the log at the level
//! the event itself asks for, with its domain and serialized payload as
//! structured fields.

use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use vpkg_events::AppEvent;

/// Install the global subscriber. Logs always go to stderr so they never
/// interleave with the progress block on stdout.
pub fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "debug"
    } else if json_mode {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_mode {
        builder.json().with_current_span(false).init();
    } else {
        builder.with_target(debug_enabled).init();
    }
}

/// Forward an event to the log
pub fn log_event(event: &AppEvent) {
    let domain = event.log_target();
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => format!("<unserializable event: {e}>"),
    };

    match event.log_level() {
        Level::ERROR => error!(domain, event = %payload, "event"),
        Level::WARN => warn!(domain, event = %payload, "event"),
        Level::INFO => info!(domain, event = %payload, "event"),
        Level::DEBUG => debug!(domain, event = %payload, "event"),
        _ => trace!(domain, event = %payload, "event"),
    }
}
