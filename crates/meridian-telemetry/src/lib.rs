//! Logging setup for Meridian applications.
//!
//! Meridian crates emit diagnostics through `tracing` macros with structured
//! fields (`request_id`, `method`, `path`, `action`, `error.kind`,
//! `error.message`). This crate installs the subscriber that turns those
//! events into output: JSON lines in production, a multi-line pretty format
//! in development.
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(request_id = %id, "request started");
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
