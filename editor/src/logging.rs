//! Tracing setup for the editor binary.
//!
//! At the default `warn` level the only events are moves the edit engine
//! refused (source, destination, reason). `debug` adds one event per applied
//! command, skipped no-op removes and adds, and snapshot reads and writes.
//! Everything goes to stderr so it never mixes with JSON written to stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber. `RUST_LOG` overrides the `warn` default.
///
/// # Example
/// ```bash
/// RUST_LOG=pipeline_editor=debug pipeline-editor apply pipeline.json --commands edits.json
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
