//! Configuration section types.

use serde::{Deserialize, Serialize};

pub use meridian_telemetry::{LogConfig, LogFormat};

/// Cookie prefix used when none is configured.
pub const DEFAULT_COOKIE_PREFIX: &str = "MERIDIAN";

/// Server section.
///
/// # Example
///
/// ```
/// use meridian_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:9000".to_string(),
///     ..ServerConfig::default()
/// };
/// assert_eq!(config.shutdown_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Seconds to wait for in-flight connections after shutdown is signaled.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum concurrent connections. Zero means unlimited.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Largest request body accepted, in bytes. Larger bodies get `413`.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_connections: default_max_connections(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    10_000
}

fn default_max_body_bytes() -> usize {
    64 << 20
}

/// Application section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name, used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Development mode: fault stacks are rendered to clients.
    #[serde(default)]
    pub dev_mode: bool,

    /// Prefix for cookies the framework sets or reads.
    #[serde(default = "default_cookie_prefix")]
    pub cookie_prefix: String,

    /// Application root directory.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            dev_mode: false,
            cookie_prefix: default_cookie_prefix(),
            base_path: default_base_path(),
        }
    }
}

fn default_app_name() -> String {
    "meridian-app".to_string()
}

fn default_cookie_prefix() -> String {
    DEFAULT_COOKIE_PREFIX.to_string()
}

fn default_base_path() -> String {
    ".".to_string()
}

/// Internationalization section.
///
/// Unset values are derived from [`AppConfig`]; see
/// [`MeridianConfig::cookie_name`](crate::MeridianConfig::cookie_name) and
/// [`MeridianConfig::messages_dir`](crate::MeridianConfig::messages_dir).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct I18nConfig {
    /// Language consulted when a locale has no catalog entry.
    #[serde(default)]
    pub default_language: Option<String>,

    /// Name of the locale cookie.
    #[serde(default)]
    pub cookie: Option<String>,

    /// Directory holding `<name>.<ll>` message files.
    #[serde(default)]
    pub messages_dir: Option<String>,
}
