//! Logging and tracing configuration
//!
//! The engine logs raw wire traffic at TRACE, scheduler and action
//! lifecycle at DEBUG, and protocol anomalies at WARN.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for a host embedding the engine (stdout logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is DEBUG for this crate, WARN for dependencies.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gdbmi_engine=debug,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
