//! # Beat Telemetry
//!
//! Structured logging for the beat detector binaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use beat_telemetry::{init_tracing, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_tracing(&TelemetryConfig::from_env())?;
//!     // Events from beat-broker are now written to stderr
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BEAT_SERVICE_NAME` | `beat-detector` | Service name on startup event |
//! | `BEAT_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `BEAT_JSON_LOGS` | `false` | One JSON object per event |
//! | `BEAT_CONSOLE_OUTPUT` | `true` | Write events to stderr at all |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    SubscriberInit(String),
}

/// Span covering one call against the worker.
///
/// ```rust,ignore
/// let _span = call_span!("analyze", path = %input.display()).entered();
/// ```
#[macro_export]
macro_rules! call_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
