//! Content-type and response-format negotiation.
//!
//! These are pure functions over request headers. Format negotiation is a
//! heuristic sniff of the `Accept` header, not full RFC 7231 negotiation: the
//! checks run in a fixed order and the first match wins.

use std::fmt;
use std::str::FromStr;

use http::header::{ACCEPT, CONTENT_TYPE};
use http::HeaderMap;
use thiserror::Error;

use crate::error::contract_violation;

/// Content type assumed when a request carries no `Content-Type` header.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Response format negotiated from the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// HTML, the default.
    #[default]
    Html,
    /// JSON.
    Json,
    /// XML.
    Xml,
    /// Plain text.
    Txt,
}

impl Format {
    /// All formats in declaration order.
    pub const ALL: [Self; 4] = [Self::Html, Self::Json, Self::Xml, Self::Txt];

    /// Returns the short name (`html`, `json`, `xml`, `txt`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Txt => "txt",
        }
    }

    /// Returns the canonical, charset-qualified content type for this format.
    ///
    /// # Example
    ///
    /// ```
    /// use meridian_core::Format;
    ///
    /// assert_eq!(Format::Json.content_type(), "application/json; charset=utf-8");
    /// ```
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Txt => "text/plain; charset=utf-8",
            Self::Xml => "text/xml; charset=utf-8",
            Self::Json => "application/json; charset=utf-8",
        }
    }

    /// Sniffs a format from a raw `Accept` header value.
    ///
    /// Total over all inputs. Anything unrecognized is [`Format::Html`].
    #[must_use]
    pub fn from_accept(accept: &str) -> Self {
        if accept.is_empty()
            || accept.starts_with("*/*")
            || accept.contains("application/xhtml")
            || accept.contains("text/html")
        {
            Self::Html
        } else if accept.contains("application/json") || accept.contains("text/javascript") {
            Self::Json
        } else if accept.contains("application/xml") || accept.contains("text/xml") {
            Self::Xml
        } else if accept.contains("text/plain") {
            Self::Txt
        } else {
            Self::Html
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a string that names no known format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "txt" => Ok(Self::Txt),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Returns the request's media type, lowercased and stripped of parameters.
///
/// Falls back to `text/html` when the header is absent, empty or not valid
/// visible ASCII.
///
/// # Example
///
/// ```
/// use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue};
/// use meridian_core::resolve_content_type;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(CONTENT_TYPE, HeaderValue::from_static("Application/JSON; charset=UTF-8"));
/// assert_eq!(resolve_content_type(&headers), "application/json");
/// ```
#[must_use]
pub fn resolve_content_type(headers: &HeaderMap) -> String {
    let raw = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if raw.is_empty() {
        return DEFAULT_CONTENT_TYPE.to_string();
    }
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Negotiates the response format from the `Accept` header.
#[must_use]
pub fn resolve_format(headers: &HeaderMap) -> Format {
    let accept = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    Format::from_accept(accept)
}

/// Maps a format name to its canonical content type.
///
/// Only the four names produced by [`Format::as_str`] are accepted. Any other
/// input is a caller bug and raises a [`ContractViolation`](crate::ContractViolation).
/// Prefer [`Format::content_type`] when a `Format` value is at hand.
#[must_use]
pub fn format_to_content_type(format: &str) -> &'static str {
    match format.parse::<Format>() {
        Ok(format) => format.content_type(),
        Err(err) => contract_violation(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use proptest::prelude::*;

    fn headers(name: http::header::HeaderName, value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn test_content_type_defaults_to_html() {
        assert_eq!(resolve_content_type(&HeaderMap::new()), "text/html");
        assert_eq!(resolve_content_type(&headers(CONTENT_TYPE, "")), "text/html");
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let map = headers(CONTENT_TYPE, " Multipart/Form-Data ; boundary=xyz");
        assert_eq!(resolve_content_type(&map), "multipart/form-data");
    }

    #[test]
    fn test_format_checks() {
        let cases = [
            ("", Format::Html),
            ("*/*", Format::Html),
            ("*/*;q=0.8, application/json", Format::Html),
            ("application/xhtml+xml", Format::Html),
            ("text/html,application/xml", Format::Html),
            ("application/json", Format::Json),
            ("text/javascript", Format::Json),
            ("application/xml", Format::Xml),
            ("text/xml", Format::Xml),
            ("text/plain", Format::Txt),
            ("image/png", Format::Html),
        ];
        for (accept, expected) in cases {
            assert_eq!(Format::from_accept(accept), expected, "accept: {accept:?}");
        }
    }

    #[test]
    fn test_html_branch_checked_before_json() {
        let map = headers(ACCEPT, "application/json, text/html;q=0.9");
        assert_eq!(resolve_format(&map), Format::Html);
    }

    #[test]
    fn test_json_before_xml() {
        assert_eq!(
            Format::from_accept("application/xml, application/json"),
            Format::Json
        );
    }

    #[test]
    fn test_format_to_content_type() {
        assert_eq!(format_to_content_type("html"), "text/html; charset=utf-8");
        assert_eq!(format_to_content_type("txt"), "text/plain; charset=utf-8");
        assert_eq!(format_to_content_type("xml"), "text/xml; charset=utf-8");
        assert_eq!(
            format_to_content_type("json"),
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn test_content_types_are_distinct() {
        let mut seen: Vec<_> = Format::ALL.iter().map(|f| f.content_type()).collect();
        seen.dedup();
        assert_eq!(seen.len(), Format::ALL.len());
        for format in Format::ALL {
            assert_eq!(format.as_str().parse::<Format>(), Ok(format));
        }
    }

    #[test]
    fn test_format_to_content_type_rejects_unknown() {
        let payload = std::panic::catch_unwind(|| format_to_content_type("csv")).unwrap_err();
        let violation = payload
            .downcast_ref::<crate::ContractViolation>()
            .expect("contract violation payload");
        assert_eq!(violation.message(), "unrecognized format: csv");
    }

    proptest! {
        #[test]
        fn prop_from_accept_is_total(accept in ".*") {
            let _ = Format::from_accept(&accept);
        }

        #[test]
        fn prop_unmatched_accept_is_html(accept in "[a-z0-9 ;=,.]*") {
            prop_assert_eq!(Format::from_accept(&accept), Format::Html);
        }
    }
}
