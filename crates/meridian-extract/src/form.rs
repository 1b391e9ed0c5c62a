//! URL-encoded parameter parsing for query strings and form bodies.

use crate::error::{ExtractionError, ExtractionSource};
use crate::params::Values;

/// Parses a URL query string into [`Values`].
///
/// # Example
///
/// ```
/// use meridian_extract::form::parse_query;
///
/// let values = parse_query("tag=a&tag=b&page=2").unwrap();
/// assert_eq!(values["tag"], ["a", "b"]);
/// assert_eq!(values["page"], ["2"]);
/// ```
pub fn parse_query(query: &str) -> Result<Values, ExtractionError> {
    decode(query.as_bytes(), ExtractionSource::Query)
}

/// Parses an `application/x-www-form-urlencoded` body into [`Values`].
pub fn parse_urlencoded(body: &[u8]) -> Result<Values, ExtractionError> {
    decode(body, ExtractionSource::Form)
}

fn decode(input: &[u8], origin: ExtractionSource) -> Result<Values, ExtractionError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(input)
        .map_err(|err| ExtractionError::malformed(origin, err.to_string()))?;

    let mut values = Values::new();
    for (key, value) in pairs {
        values.entry(key).or_default().push(value);
    }
    Ok(values)
}
