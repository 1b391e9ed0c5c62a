//! The language-keyed message catalog.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use crate::format::format_message;
use crate::loader::load_messages;
use crate::messages::MessageFile;

/// Splits a locale into language and region at the first `-`.
///
/// # Example
///
/// ```
/// use meridian_i18n::parse_locale;
///
/// assert_eq!(parse_locale("en-US"), ("en", "US"));
/// assert_eq!(parse_locale("fr"), ("fr", ""));
/// ```
#[must_use]
pub fn parse_locale(locale: &str) -> (&str, &str) {
    locale.split_once('-').unwrap_or((locale, ""))
}

/// Translated messages for every loaded language.
///
/// Built once at startup, then shared read-only (usually behind an `Arc`).
/// Lookups never fail: unknown languages fall back to the default language and
/// unresolvable keys produce a `??? key ???` marker.
///
/// # Example
///
/// ```
/// use meridian_i18n::{MessageCatalog, MessageFile};
///
/// let mut catalog = MessageCatalog::new(Some("en".into()));
/// catalog.insert("en", MessageFile::parse("greeting=Hello %s\n[US]\ngreeting=Howdy %s").unwrap());
///
/// assert_eq!(catalog.message("en-US", "greeting", &[&"Sam"]), "Howdy Sam");
/// assert_eq!(catalog.message("de", "greeting", &[&"Sam"]), "Hello Sam");
/// assert_eq!(catalog.message("de", "missing", &[]), "??? missing ???");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    languages: HashMap<String, MessageFile>,
    default_language: Option<String>,
}

impl MessageCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new(default_language: Option<String>) -> Self {
        Self {
            languages: HashMap::new(),
            default_language,
        }
    }

    /// Loads every message file under `dir`.
    ///
    /// See [`load_messages`] for the file selection rules.
    #[must_use]
    pub fn load(dir: impl AsRef<Path>, default_language: Option<String>) -> Self {
        Self {
            languages: load_messages(dir.as_ref()),
            default_language,
        }
    }

    /// Adds messages for `language`, merging with any already present.
    pub fn insert(&mut self, language: impl Into<String>, file: MessageFile) {
        let language = language.into().to_lowercase();
        match self.languages.get_mut(&language) {
            Some(existing) => existing.merge(file),
            None => {
                self.languages.insert(language, file);
            }
        }
    }

    /// Returns the configured default language.
    pub fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    /// Returns the loaded language keys.
    pub fn languages(&self) -> Vec<&str> {
        self.languages.keys().map(String::as_str).collect()
    }

    /// Returns `true` if messages for `language` are loaded.
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Resolves `key` for `locale` and substitutes `args`.
    #[must_use]
    pub fn message(&self, locale: &str, key: &str, args: &[&dyn Display]) -> String {
        let Some(value) = self.lookup(locale, key) else {
            return format!("??? {key} ???");
        };
        if args.is_empty() {
            value.to_string()
        } else {
            format_message(value, args)
        }
    }

    /// Resolves the raw template for `key` without substitution.
    #[must_use]
    pub fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        let (language, region) = parse_locale(locale);
        tracing::trace!(key, language, region, "resolving message");

        let found = match self.languages.get(language) {
            Some(file) => file.get(region, key),
            None => {
                tracing::trace!(locale, key, "unsupported language, trying default");
                None
            }
        };
        if let Some(value) = found.filter(|value| !value.is_empty()) {
            return Some(value);
        }

        let Some(default_language) = self.default_language.as_deref() else {
            tracing::warn!(
                key,
                locale,
                "no default language configured, message cannot be translated"
            );
            return None;
        };
        let Some(file) = self.languages.get(default_language) else {
            tracing::warn!(default_language, key, "unsupported default language");
            return None;
        };
        let value = file.get(region, key);
        if value.is_none() {
            tracing::warn!(key, locale, default_language, "unknown message");
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MessageCatalog {
        let mut catalog = MessageCatalog::new(Some("en".to_string()));
        catalog.insert(
            "en",
            MessageFile::parse("greeting=Hello\nempty_fr=English\n[US]\ngreeting=Hello\ncolor=color\n[GB]\ncolor=colour\n")
                .unwrap(),
        );
        catalog.insert(
            "fr",
            MessageFile::parse("bonjour=Bonjour\nempty_fr=\n").unwrap(),
        );
        catalog
    }

    #[test]
    fn test_region_match() {
        let c = catalog();
        assert_eq!(c.message("en-US", "greeting", &[]), "Hello");
        assert_eq!(c.message("en-GB", "color", &[]), "colour");
        assert_eq!(c.message("en-US", "color", &[]), "color");
    }

    #[test]
    fn test_region_falls_back_to_language_default() {
        assert_eq!(catalog().message("en-GB", "greeting", &[]), "Hello");
    }

    #[test]
    fn test_unknown_language_uses_default_language() {
        assert_eq!(catalog().message("xx", "greeting", &[]), "Hello");
    }

    #[test]
    fn test_known_language_missing_key_uses_default_language() {
        assert_eq!(catalog().message("fr", "greeting", &[]), "Hello");
    }

    #[test]
    fn test_empty_value_uses_default_language() {
        assert_eq!(catalog().message("fr", "empty_fr", &[]), "English");
    }

    #[test]
    fn test_default_language_region_is_kept() {
        assert_eq!(catalog().message("de-GB", "color", &[]), "colour");
    }

    #[test]
    fn test_unresolvable_key() {
        assert_eq!(catalog().message("xx", "missing", &[]), "??? missing ???");
    }

    #[test]
    fn test_without_default_language() {
        let mut c = catalog();
        c.default_language = None;
        assert_eq!(c.message("xx", "greeting", &[]), "??? greeting ???");
        assert_eq!(c.message("fr", "bonjour", &[]), "Bonjour");
    }

    #[test]
    fn test_unknown_default_language() {
        let mut c = catalog();
        c.default_language = Some("de".to_string());
        assert_eq!(c.message("xx", "greeting", &[]), "??? greeting ???");
    }

    #[test]
    fn test_insert_merges_and_lowercases() {
        let mut c = catalog();
        c.insert("FR", MessageFile::parse("bonjour=Salut\n").unwrap());
        assert_eq!(c.message("fr", "bonjour", &[]), "Salut");
        let mut languages = c.languages();
        languages.sort_unstable();
        assert_eq!(languages, ["en", "fr"]);
    }

    #[test]
    fn test_args_substituted() {
        let mut c = MessageCatalog::new(None);
        c.insert("en", MessageFile::parse("items=%d items").unwrap());
        assert_eq!(c.message("en", "items", &[&4]), "4 items");
    }
}
