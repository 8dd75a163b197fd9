//! # vaultsync-logging
//!
//! Notices and diagnostics for vaultsync.
//!
//! A sync reports its progress as a handful of user-facing notices (start,
//! each failure, final success). This crate renders those notices and sets
//! up `tracing` for the lower-level diagnostics the other crates emit.
//!
//! ## Key Types
//!
//! - [`Logger`] - Renders notices to stderr and, optionally, a log file
//! - [`LogEvent`] - Notice types
//! - [`LogFormat`] - Output formats (Pretty, JSON, Compact)
//!
//! ## Log Formats
//!
//! - `Pretty` - Human-readable colored output
//! - `JSON` - Structured JSON lines
//! - `Compact` - Minimal text output

mod events;

pub use events::{LogEvent, LogFormat, Logger, SyncStep, ERROR_DISPLAY, NOTICE_DISPLAY};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for the application
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(false))
                .init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .init();
        }
    }
}
