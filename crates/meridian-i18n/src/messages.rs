//! Sectioned message files.
//!
//! A message file is a plain-text list of `key=value` (or `key: value`) entries
//! grouped under `[SECTION]` headers. Sections hold region-specific messages;
//! entries before the first header, or under `[DEFAULT]`, form the fallback
//! section every region inherits from. Lines starting with `#` or `;` are
//! comments.
//!
//! ```text
//! greeting=Hello
//! farewell=Goodbye
//!
//! [GB]
//! greeting=Hello, mate
//! ```

use std::collections::HashMap;

/// Name of the fallback section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Messages for one language, grouped by region section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl MessageFile {
    /// Creates an empty file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses message file text.
    ///
    /// On failure returns the one-based line number and a description.
    pub fn parse(text: &str) -> Result<Self, (usize, String)> {
        let mut file = Self::new();
        let mut section = DEFAULT_SECTION.to_string();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| (index + 1, format!("malformed section header '{line}'")))?;
                section = name.to_string();
                continue;
            }

            let Some(split) = line.find(['=', ':']) else {
                return Err((index + 1, format!("expected 'key=value', found '{line}'")));
            };
            let key = line[..split].trim();
            if key.is_empty() {
                return Err((index + 1, "entry has an empty key".to_string()));
            }
            let value = line[split + 1..].trim();
            file.insert(&section, key, value);
        }

        Ok(file)
    }

    /// Sets `key` in `section`.
    pub fn insert(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Looks `key` up in `section`, falling back to the default section.
    ///
    /// An empty section name means the default section.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let section = if section.is_empty() {
            DEFAULT_SECTION
        } else {
            section
        };
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .or_else(|| {
                self.sections
                    .get(DEFAULT_SECTION)
                    .and_then(|entries| entries.get(key))
            })
            .map(String::as_str)
    }

    /// Merges `other` into this file. Entries in `other` win on collision.
    pub fn merge(&mut self, other: Self) {
        for (section, entries) in other.sections {
            self.sections.entry(section).or_default().extend(entries);
        }
    }

    /// Returns the section names.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Returns the total number of entries across sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.values().map(HashMap::len).sum()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# greetings
greeting=Hello
farewell: Goodbye

[US]
greeting = Howdy
; empty values are kept
blank=
";

    #[test]
    fn test_parse_sections() {
        let file = MessageFile::parse(SAMPLE).unwrap();
        assert_eq!(file.get("", "greeting"), Some("Hello"));
        assert_eq!(file.get("US", "greeting"), Some("Howdy"));
        assert_eq!(file.get("US", "farewell"), Some("Goodbye"));
        assert_eq!(file.get("US", "blank"), Some(""));
        assert_eq!(file.len(), 4);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let file = MessageFile::parse(SAMPLE).unwrap();
        assert_eq!(file.get("GB", "greeting"), Some("Hello"));
        assert_eq!(file.get("GB", "unknown"), None);
    }

    #[test]
    fn test_explicit_default_section() {
        let file = MessageFile::parse("[DEFAULT]\na=1\n[FR]\nb=2\n").unwrap();
        assert_eq!(file.get("FR", "a"), Some("1"));
    }

    #[test]
    fn test_value_may_contain_separators() {
        let file = MessageFile::parse("url=http://example.com/?a=b\n").unwrap();
        assert_eq!(file.get("", "url"), Some("http://example.com/?a=b"));
    }

    #[test]
    fn test_parse_errors_report_line() {
        assert_eq!(MessageFile::parse("a=1\nnot an entry\n").unwrap_err().0, 2);
        assert_eq!(MessageFile::parse("[open\n").unwrap_err().0, 1);
        assert_eq!(MessageFile::parse("=x\n").unwrap_err().0, 1);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut first = MessageFile::parse("a=1\nb=1\n").unwrap();
        let second = MessageFile::parse("b=2\n[US]\nc=3\n").unwrap();
        first.merge(second);
        assert_eq!(first.get("", "a"), Some("1"));
        assert_eq!(first.get("", "b"), Some("2"));
        assert_eq!(first.get("US", "c"), Some("3"));
    }
}
