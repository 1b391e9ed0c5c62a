//! Request cookie parsing.

use std::collections::HashMap;

use http::header::COOKIE;
use http::HeaderMap;
use percent_encoding::percent_decode_str;

/// Cookies sent with a request.
///
/// # Example
///
/// ```rust
/// use http::{header::COOKIE, HeaderMap, HeaderValue};
/// use meridian_extract::Cookies;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(COOKIE, HeaderValue::from_static("MERIDIAN_LANG=fr-CA; theme=dark"));
///
/// let cookies = Cookies::from_headers(&headers);
/// assert_eq!(cookies.get("MERIDIAN_LANG"), Some("fr-CA"));
/// assert_eq!(cookies.get("theme"), Some("dark"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    cookies: HashMap<String, String>,
}

impl Cookies {
    /// Creates an empty cookie set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every `Cookie` header in `headers`.
    ///
    /// Headers that are not valid visible ASCII are skipped.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::new();
        for value in headers.get_all(COOKIE) {
            if let Ok(raw) = value.to_str() {
                cookies.extend_from(raw);
            }
        }
        cookies
    }

    /// Parses a single `Cookie` header value.
    #[must_use]
    pub fn parse(header_value: &str) -> Self {
        let mut cookies = Self::new();
        cookies.extend_from(header_value);
        cookies
    }

    fn extend_from(&mut self, header_value: &str) {
        for pair in header_value.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                let value = value.trim().trim_matches('"');
                let value = percent_decode_str(value).decode_utf8_lossy();
                // first occurrence wins, matching browser send order
                self.cookies
                    .entry(name.trim().to_string())
                    .or_insert_with(|| value.into_owned());
            }
        }
    }

    /// Returns a cookie value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns `true` if the cookie is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Iterates over all cookies.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns `true` if there are no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_pairs() {
        let cookies = Cookies::parse("a=1; b = 2 ;c=\"quoted\"");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies.get("b"), Some("2"));
        assert_eq!(cookies.get("c"), Some("quoted"));
    }

    #[test]
    fn test_percent_decoding() {
        let cookies = Cookies::parse("msg=hello%20world");
        assert_eq!(cookies.get("msg"), Some("hello world"));
    }

    #[test]
    fn test_ignores_malformed_pairs() {
        let cookies = Cookies::parse("novalue; ok=yes");
        assert!(!cookies.contains("novalue"));
        assert!(cookies.contains("ok"));
    }

    #[test]
    fn test_multiple_headers_first_wins() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("lang=de"));
        headers.append(COOKIE, HeaderValue::from_static("lang=fr; x=1"));
        let cookies = Cookies::from_headers(&headers);
        assert_eq!(cookies.get("lang"), Some("de"));
        assert_eq!(cookies.get("x"), Some("1"));
    }

    #[test]
    fn test_no_header() {
        assert!(Cookies::from_headers(&HeaderMap::new()).is_empty());
    }
}
