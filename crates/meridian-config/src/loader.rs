//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, LogFormat, MeridianConfig};

/// Environment prefix used by [`ConfigLoader::with_default_env`].
pub const DEFAULT_ENV_PREFIX: &str = "MERIDIAN";

/// Builds a [`MeridianConfig`] from layers, later layers winning:
///
/// 1. defaults (or a preset)
/// 2. a TOML or JSON file, chosen by extension
/// 3. environment variables of the form `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use meridian_config::ConfigLoader;
///
/// # fn main() -> Result<(), meridian_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("conf/app.toml")?
///     .with_dotenv()
///     .with_default_env()
///     .load()?;
/// println!("listening on {}", config.server.http_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: MeridianConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the [development](MeridianConfig::development) preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = MeridianConfig::development();
        self
    }

    /// Starts from the [production](MeridianConfig::production) preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = MeridianConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file.
    ///
    /// Sections present in the file replace the current ones; fields missing
    /// from a present section take their defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, malformed, has an unknown
    /// extension or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = parse(&content, &format)?;
        Ok(self)
    }

    /// Loads a file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) when the file exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration text in the named format (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Fails on malformed content, unknown fields or an unknown format.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Reads a `.env` file into the process environment, if one exists.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        let _ = dotenvy::dotenv();
        self
    }

    /// Applies `PREFIX__SECTION__KEY` environment overrides at load time.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies `MERIDIAN__SECTION__KEY` environment overrides at load time.
    #[must_use]
    pub fn with_default_env(self) -> Self {
        self.with_env_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Applies environment overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Fails on an unknown or unparsable override or a failed
    /// [validation](MeridianConfig::validate).
    pub fn load(mut self) -> Result<MeridianConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> MeridianConfig {
        self.config
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();
        vars.sort();

        for (key, value) in vars {
            let path = &key[marker.len()..];
            self.apply_env_var(&key, path, &value)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "MAX_CONNECTIONS"] => {
                config.server.max_connections = parse_number(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                config.server.max_body_bytes = parse_number(key, value)?;
            }

            ["APP", "NAME"] => config.app.name = value.to_string(),
            ["APP", "DEV_MODE"] => config.app.dev_mode = parse_flag(key, value)?,
            ["APP", "COOKIE_PREFIX"] => config.app.cookie_prefix = value.to_string(),
            ["APP", "BASE_PATH"] => config.app.base_path = value.to_string(),

            ["I18N", "DEFAULT_LANGUAGE"] => config.i18n.default_language = non_empty(value),
            ["I18N", "COOKIE"] => config.i18n.cookie = non_empty(value),
            ["I18N", "MESSAGES_DIR"] => config.i18n.messages_dir = non_empty(value),

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_flag(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                config.logging.include_location = parse_flag(key, value)?;
            }
            ["LOGGING", "ANSI"] => config.logging.ansi = parse_flag(key, value)?,

            _ => return Err(ConfigError::env_parse_error(key, "unknown configuration key")),
        }
        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<MeridianConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_load() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
        assert_eq!(config.cookie_name(), "MERIDIAN_LANG");
    }

    #[test]
    fn test_toml_string() {
        let config = ConfigLoader::new()
            .with_string(
                r#"
                [app]
                dev_mode = true
                cookie_prefix = "SHOP"

                [i18n]
                default_language = "en"
                "#,
                "toml",
            )
            .unwrap()
            .load()
            .unwrap();

        assert!(config.app.dev_mode);
        assert_eq!(config.cookie_name(), "SHOP_LANG");
        assert_eq!(config.i18n.default_language.as_deref(), Some("en"));
        assert_eq!(config.server.shutdown_timeout_secs, 30);
    }

    #[test]
    fn test_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"server": {{"http_addr": "127.0.0.1:3000"}}}}"#).unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ConfigLoader::new()
            .with_string("[server]\nport = 80", "toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref f) if f == "yaml"));
    }

    #[test]
    fn test_missing_and_optional_files() {
        let err = ConfigLoader::new().with_file("/nonexistent/meridian.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        assert!(ConfigLoader::new()
            .with_optional_file("/nonexistent/meridian.toml")
            .is_ok());
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("MERIDIANTESTA__APP__DEV_MODE", "yes");
        env::set_var("MERIDIANTESTA__I18N__COOKIE", "locale");
        env::set_var("MERIDIANTESTA__LOGGING__FORMAT", "pretty");
        env::set_var("MERIDIANTESTA__SERVER__MAX_BODY_BYTES", "1048576");

        let config = ConfigLoader::new()
            .with_env_prefix("meridiantesta")
            .load()
            .unwrap();

        assert!(config.app.dev_mode);
        assert_eq!(config.cookie_name(), "locale");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.server.max_body_bytes, 1 << 20);
    }

    #[test]
    fn test_env_override_errors() {
        env::set_var("MERIDIANTESTB__SERVER__MAX_CONNECTIONS", "many");
        let err = ConfigLoader::new()
            .with_env_prefix("MERIDIANTESTB")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));

        env::set_var("MERIDIANTESTC__APP__THEME", "dark");
        let err = ConfigLoader::new()
            .with_env_prefix("MERIDIANTESTC")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("unknown configuration key"));
    }

    #[test]
    fn test_env_prefix_requires_separator() {
        env::set_var("MERIDIANTESTD_HOME", "/opt");
        assert!(ConfigLoader::new()
            .with_env_prefix("MERIDIANTESTD")
            .load()
            .is_ok());
    }
}
