//! Loading message files from disk.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{I18nError, I18nResult};
use crate::messages::MessageFile;

/// Directory name, relative to the application base path, that holds message files.
pub const MESSAGES_DIR: &str = "messages";

fn message_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\w+\.[a-zA-Z]{2}$").expect("valid message file pattern"))
}

/// Returns the language key for a message file name, or `None` if the name is
/// not `<name>.<two-letter language>`.
///
/// # Example
///
/// ```
/// use meridian_i18n::language_of;
///
/// assert_eq!(language_of("sample.EN").as_deref(), Some("en"));
/// assert_eq!(language_of("sample.json"), None);
/// ```
#[must_use]
pub fn language_of(file_name: &str) -> Option<String> {
    if !message_file_pattern().is_match(file_name) {
        return None;
    }
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_lowercase())
}

/// Walks `dir` recursively and parses every message file found.
///
/// Files are visited in name order so that merging is deterministic: when two
/// files provide the same language, the later one wins on overlapping keys. A
/// missing directory yields an empty map. Unreadable entries and files that
/// fail to parse are logged and skipped.
#[must_use]
pub fn load_messages(dir: &Path) -> HashMap<String, MessageFile> {
    let mut languages: HashMap<String, MessageFile> = HashMap::new();

    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "message directory not found, catalog is empty");
        return languages;
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::error!(error = %err, "error reading message files");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let Some(language) = language_of(&file_name) else {
            tracing::debug!(file = %file_name, "ignoring file without a language extension");
            continue;
        };

        match read_message_file(entry.path()) {
            Ok(file) => {
                match languages.get_mut(&language) {
                    Some(existing) => {
                        existing.merge(file);
                        tracing::debug!(language = %language, "merged messages");
                    }
                    None => {
                        languages.insert(language.clone(), file);
                    }
                }
                tracing::info!(file = %entry.path().display(), language = %language, "loaded messages");
            }
            Err(err) => tracing::error!(error = %err, "skipping message file"),
        }
    }

    languages
}

/// Reads and parses one message file.
pub fn read_message_file(path: &Path) -> I18nResult<MessageFile> {
    let text = std::fs::read_to_string(path).map_err(|source| I18nError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    MessageFile::parse(&text).map_err(|(line, message)| I18nError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_of() {
        assert_eq!(language_of("app.fr").as_deref(), Some("fr"));
        assert_eq!(language_of("app_2.De").as_deref(), Some("de"));
        assert_eq!(language_of("app.fra"), None);
        assert_eq!(language_of(".en"), None);
        assert_eq!(language_of("my-app.en"), None);
        assert_eq!(language_of("appxen"), None);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_messages(&dir.path().join("nope")).is_empty());
    }

    #[test]
    fn test_parse_error_names_file_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.en");
        std::fs::write(&path, "ok=1\n???\n").unwrap();
        let err = read_message_file(&path).unwrap_err();
        assert!(matches!(err, I18nError::Parse { line: 2, .. }));
    }
}
