//! Error types for message loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error raised while reading message files.
///
/// Loading never aborts on these: the loader logs them and keeps whatever it
/// could read.
#[derive(Error, Debug)]
pub enum I18nError {
    /// A message file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A message file contained a line that is neither a section, an entry nor
    /// a comment.
    #[error("{path}:{line}: {message}")]
    Parse {
        /// The file being parsed.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },
}

/// Result type for i18n operations.
pub type I18nResult<T> = Result<T, I18nError>;
