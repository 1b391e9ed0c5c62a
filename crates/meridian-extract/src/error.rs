//! Extraction error types.
//!
//! Body and query parsing never fail a request: these errors are produced by
//! the individual parsers, logged by [`parse_params`](crate::parse_params), and
//! replaced with an empty source.

use std::fmt;
use std::io;

use thiserror::Error;

/// Where the data being parsed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// URL query string.
    Query,
    /// `application/x-www-form-urlencoded` body.
    Form,
    /// `multipart/form-data` body.
    Multipart,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Form => write!(f, "form"),
            Self::Multipart => write!(f, "multipart"),
        }
    }
}

/// Error raised while parsing a parameter source.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The source could not be decoded.
    #[error("malformed {origin} data: {message}")]
    Malformed {
        /// The source being parsed.
        origin: ExtractionSource,
        /// What went wrong.
        message: String,
    },

    /// A multipart body arrived without a usable boundary.
    #[error("missing or invalid multipart boundary")]
    MissingBoundary,

    /// The multipart stream itself was malformed.
    #[error("multipart parse error: {0}")]
    Multipart(#[from] multer::Error),

    /// Spilling an upload to disk failed.
    #[error("upload storage error: {0}")]
    Io(#[from] io::Error),
}

impl ExtractionError {
    /// Creates a [`Malformed`](Self::Malformed) error.
    pub fn malformed(origin: ExtractionSource, message: impl Into<String>) -> Self {
        Self::Malformed {
            origin,
            message: message.into(),
        }
    }

    /// Returns the source the error relates to.
    #[must_use]
    pub fn origin(&self) -> ExtractionSource {
        match self {
            Self::Malformed { origin, .. } => *origin,
            Self::MissingBoundary | Self::Multipart(_) | Self::Io(_) => ExtractionSource::Multipart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ExtractionError::malformed(ExtractionSource::Query, "bad escape");
        assert_eq!(err.to_string(), "malformed query data: bad escape");
        assert_eq!(err.origin(), ExtractionSource::Query);
        assert_eq!(
            ExtractionError::MissingBoundary.origin(),
            ExtractionSource::Multipart
        );
    }
}
