//! `Accept-Language` parsing.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

use http::header::ACCEPT_LANGUAGE;
use http::HeaderMap;

/// One language range from an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptLanguage {
    /// The language tag, e.g. `en-US`.
    pub language: String,
    /// The quality weight in `[0, 1]`.
    pub quality: f32,
}

/// Language ranges sorted by descending quality.
///
/// Ranges with equal quality keep their header order.
///
/// # Example
///
/// ```
/// use meridian_core::AcceptLanguages;
///
/// let langs = AcceptLanguages::parse("fr;q=0.8, en-US, de;q=0.9");
/// assert_eq!(langs.to_string(), "en-US (1.0), de (0.9), fr (0.8)");
/// assert_eq!(langs.preferred(), Some("en-US"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptLanguages(Vec<AcceptLanguage>);

impl AcceptLanguages {
    /// Parses a raw header value.
    ///
    /// Every comma-separated range yields an entry, empty ones included. A
    /// range with exactly one `;q=` takes its quality from the suffix; a range
    /// without one has quality 1.0. A quality that does not parse as a float
    /// in `[0, 1]` is logged and treated as 1.0, and so is a range repeating
    /// `;q=`, which is kept whole as the language. A blank header is empty.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        if header.trim().is_empty() {
            return Self::default();
        }

        let mut languages: Vec<AcceptLanguage> = header
            .split(',')
            .map(|range| parse_range(range.trim(), header))
            .collect();

        // sort_by is stable, ties keep header order
        languages.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
        Self(languages)
    }

    /// Returns the highest-quality language tag.
    #[must_use]
    pub fn preferred(&self) -> Option<&str> {
        self.0.first().map(|entry| entry.language.as_str())
    }

    /// Consumes the list, returning the sorted entries.
    #[must_use]
    pub fn into_inner(self) -> Vec<AcceptLanguage> {
        self.0
    }
}

fn parse_range(range: &str, header: &str) -> AcceptLanguage {
    let mut parts = range.split(";q=");
    match (parts.next(), parts.next(), parts.next()) {
        (Some(language), Some(quality), None) => AcceptLanguage {
            language: language.trim().to_string(),
            quality: parse_quality(quality, header),
        },
        (_, Some(_), Some(_)) => {
            tracing::warn!(
                header = %header,
                range = %range,
                "repeated Accept-Language quality, assuming 1.0"
            );
            AcceptLanguage {
                language: range.to_string(),
                quality: 1.0,
            }
        }
        _ => AcceptLanguage {
            language: range.to_string(),
            quality: 1.0,
        },
    }
}

fn parse_quality(raw: &str, header: &str) -> f32 {
    match raw.trim().parse::<f32>() {
        Ok(quality) if (0.0..=1.0).contains(&quality) => quality,
        _ => {
            tracing::warn!(
                header = %header,
                quality = %raw,
                "malformed Accept-Language quality, assuming 1.0"
            );
            1.0
        }
    }
}

impl Deref for AcceptLanguages {
    type Target = [AcceptLanguage];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for AcceptLanguages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} ({:.1})", entry.language, entry.quality)?;
        }
        Ok(())
    }
}

/// Parses the request's `Accept-Language` header.
///
/// An absent or non-ASCII header yields an empty list.
#[must_use]
pub fn resolve_accept_language(headers: &HeaderMap) -> AcceptLanguages {
    headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(AcceptLanguages::parse)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use proptest::prelude::*;

    fn languages(langs: &AcceptLanguages) -> Vec<&str> {
        langs.iter().map(|l| l.language.as_str()).collect()
    }

    #[test]
    fn test_missing_header_is_empty() {
        let langs = resolve_accept_language(&HeaderMap::new());
        assert!(langs.is_empty());
        assert_eq!(langs.preferred(), None);
    }

    #[test]
    fn test_sorted_by_quality() {
        let langs = AcceptLanguages::parse("da, en-GB;q=0.8, en;q=0.7");
        assert_eq!(languages(&langs), ["da", "en-GB", "en"]);
        assert!((langs[1].quality - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ties_keep_header_order() {
        let langs = AcceptLanguages::parse("fr;q=0.5, de, nl;q=0.5, en");
        assert_eq!(languages(&langs), ["de", "en", "fr", "nl"]);
    }

    #[test]
    fn test_malformed_quality_defaults_to_one() {
        let langs = AcceptLanguages::parse("fr;q=abc, en;q=0.3");
        assert_eq!(languages(&langs), ["fr", "en"]);
        assert!((langs[0].quality - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_out_of_range_quality_defaults_to_one() {
        let langs = AcceptLanguages::parse("es;q=4.2");
        assert!((langs[0].quality - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_ranges_are_kept() {
        let langs = AcceptLanguages::parse("en,,fr;q=0.5,");
        assert_eq!(languages(&langs), ["en", "", "", "fr"]);
        assert!(langs[1..3].iter().all(|l| (l.quality - 1.0).abs() < f32::EPSILON));

        assert!(AcceptLanguages::parse("  ").is_empty());
    }

    #[test]
    fn test_repeated_quality_keeps_whole_range() {
        let langs = AcceptLanguages::parse("de;q=0.9, en;q=0.5;q=0.3");
        assert_eq!(languages(&langs), ["en;q=0.5;q=0.3", "de"]);
        assert!((langs[0].quality - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_resolve_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let langs = resolve_accept_language(&headers);
        assert_eq!(langs.preferred(), Some("en-US"));
        assert_eq!(langs.to_string(), "en-US (1.0), en (0.9)");
    }

    proptest! {
        #[test]
        fn prop_sorted_non_increasing(
            entries in proptest::collection::vec(("[a-z]{2}", proptest::option::of("[0-9a-z.]{1,4}")), 0..8)
        ) {
            let header = entries
                .iter()
                .map(|(lang, q)| match q {
                    Some(q) => format!("{lang};q={q}"),
                    None => lang.clone(),
                })
                .collect::<Vec<_>>()
                .join(",");
            let langs = AcceptLanguages::parse(&header);
            prop_assert_eq!(langs.len(), entries.len());
            for pair in langs.windows(2) {
                prop_assert!(pair[0].quality >= pair[1].quality);
            }
        }

        #[test]
        fn prop_missing_quality_is_one(lang in "[a-z]{2}(-[A-Z]{2})?") {
            let langs = AcceptLanguages::parse(&lang);
            prop_assert_eq!(langs.len(), 1);
            prop_assert!((langs[0].quality - 1.0).abs() < f32::EPSILON);
        }
    }
}
