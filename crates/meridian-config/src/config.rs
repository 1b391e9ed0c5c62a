//! The root configuration type.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{AppConfig, ConfigError, I18nConfig, LogConfig, ServerConfig};

/// Complete application configuration.
///
/// Values are read once at startup and not changed afterwards. Use
/// [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use meridian_config::MeridianConfig;
///
/// let config = MeridianConfig::default();
/// assert_eq!(config.cookie_name(), "MERIDIAN_LANG");
/// assert_eq!(config.messages_dir(), std::path::PathBuf::from("./messages"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MeridianConfig {
    /// Server section.
    #[serde(default)]
    pub server: ServerConfig,

    /// Application section.
    #[serde(default)]
    pub app: AppConfig,

    /// Internationalization section.
    #[serde(default)]
    pub i18n: I18nConfig,

    /// Logging section.
    #[serde(default)]
    pub logging: LogConfig,
}

impl MeridianConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> MeridianConfigBuilder {
        MeridianConfigBuilder::new()
    }

    /// Checks values that deserialize but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparsable bind address,
    /// an empty cookie prefix or cookie name, or a default language that is
    /// not a two-letter code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.app.cookie_prefix.is_empty() {
            return Err(ConfigError::invalid_value(
                "app.cookie_prefix",
                "must not be empty",
            ));
        }

        if self.i18n.cookie.as_deref() == Some("") {
            return Err(ConfigError::invalid_value("i18n.cookie", "must not be empty"));
        }

        if let Some(language) = &self.i18n.default_language {
            if language.len() != 2 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::invalid_value(
                    "i18n.default_language",
                    format!("expected a two-letter language code, got `{language}`"),
                ));
            }
        }

        Ok(())
    }

    /// Development preset: dev mode on, pretty debug logging.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.app.dev_mode = true;
        config.logging = LogConfig::development();
        config
    }

    /// Production preset: dev mode off, JSON info logging.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.app.dev_mode = false;
        config.logging = LogConfig::production();
        config
    }

    /// Name of the locale cookie.
    ///
    /// `i18n.cookie` when set, otherwise `<app.cookie_prefix>_LANG`.
    #[must_use]
    pub fn cookie_name(&self) -> String {
        match &self.i18n.cookie {
            Some(name) => name.clone(),
            None => format!("{}_LANG", self.app.cookie_prefix),
        }
    }

    /// Directory holding message files.
    ///
    /// `i18n.messages_dir` when set, otherwise `<app.base_path>/messages`.
    #[must_use]
    pub fn messages_dir(&self) -> PathBuf {
        match &self.i18n.messages_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.app.base_path).join("messages"),
        }
    }

    /// Default language, lowercased.
    #[must_use]
    pub fn default_language(&self) -> Option<String> {
        self.i18n.default_language.as_ref().map(|l| l.to_lowercase())
    }
}

/// Builder for [`MeridianConfig`].
#[derive(Debug, Default)]
pub struct MeridianConfigBuilder {
    config: MeridianConfig,
}

impl MeridianConfigBuilder {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Sets the application section.
    #[must_use]
    pub fn app(mut self, app: AppConfig) -> Self {
        self.config.app = app;
        self
    }

    /// Sets the i18n section.
    #[must_use]
    pub fn i18n(mut self, i18n: I18nConfig) -> Self {
        self.config.i18n = i18n;
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Returns the configuration without validating it.
    #[must_use]
    pub fn build(self) -> MeridianConfig {
        self.config
    }

    /// Returns the configuration after [validating](MeridianConfig::validate) it.
    pub fn build_validated(self) -> Result<MeridianConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;

    #[test]
    fn test_derived_cookie_name() {
        let mut config = MeridianConfig::default();
        assert_eq!(config.cookie_name(), "MERIDIAN_LANG");

        config.app.cookie_prefix = "SHOP".to_string();
        assert_eq!(config.cookie_name(), "SHOP_LANG");

        config.i18n.cookie = Some("lang".to_string());
        assert_eq!(config.cookie_name(), "lang");
    }

    #[test]
    fn test_derived_messages_dir() {
        let mut config = MeridianConfig::default();
        config.app.base_path = "/srv/app".to_string();
        assert_eq!(config.messages_dir(), PathBuf::from("/srv/app/messages"));

        config.i18n.messages_dir = Some("/etc/app/i18n".to_string());
        assert_eq!(config.messages_dir(), PathBuf::from("/etc/app/i18n"));
    }

    #[test]
    fn test_presets() {
        let dev = MeridianConfig::development();
        assert!(dev.app.dev_mode);
        assert_eq!(dev.logging.format, LogFormat::Pretty);

        let prod = MeridianConfig::production();
        assert!(!prod.app.dev_mode);
        assert_eq!(prod.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate() {
        assert!(MeridianConfig::default().validate().is_ok());

        let bad_addr = MeridianConfig::builder()
            .server(ServerConfig {
                http_addr: "localhost".to_string(),
                ..ServerConfig::default()
            })
            .build_validated();
        assert!(matches!(bad_addr, Err(ConfigError::InvalidValue { ref field, .. }) if field == "server.http_addr"));

        let no_body = MeridianConfig::builder()
            .server(ServerConfig {
                max_body_bytes: 0,
                ..ServerConfig::default()
            })
            .build_validated();
        assert!(matches!(no_body, Err(ConfigError::InvalidValue { ref field, .. }) if field == "server.max_body_bytes"));

        let bad_language = MeridianConfig::builder()
            .i18n(I18nConfig {
                default_language: Some("english".to_string()),
                ..I18nConfig::default()
            })
            .build_validated();
        assert!(bad_language.is_err());
    }

    #[test]
    fn test_default_language_is_lowercased() {
        let mut config = MeridianConfig::default();
        config.i18n.default_language = Some("EN".to_string());
        assert_eq!(config.default_language().as_deref(), Some("en"));
    }
}
