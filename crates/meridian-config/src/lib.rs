//! Typed configuration for Meridian applications.
//!
//! Configuration is layered: built-in defaults, then an optional TOML or
//! JSON file, then `MERIDIAN__SECTION__KEY` environment variables (with
//! `.env` support). Unknown fields are rejected.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! max_connections = 10000
//! max_body_bytes = 67108864
//!
//! [app]
//! name = "booking"
//! dev_mode = false
//! cookie_prefix = "BOOKING"
//! base_path = "/srv/booking"
//!
//! [i18n]
//! default_language = "en"
//! # cookie = "BOOKING_LANG"
//! # messages_dir = "/srv/booking/messages"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{MeridianConfig, MeridianConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{AppConfig, I18nConfig, LogConfig, LogFormat, ServerConfig, DEFAULT_COOKIE_PREFIX};
