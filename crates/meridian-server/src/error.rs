//! Server error types.

use meridian_middleware::ChainError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Errors from building or running a [`Server`](crate::Server).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The bind address does not parse.
    #[error("invalid address `{addr}`: {source}")]
    InvalidAddress {
        /// Configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not be bound.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// Address that was tried.
        addr: std::net::SocketAddr,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A route could not be registered.
    #[error("invalid route `{method} {pattern}`: {reason}")]
    InvalidRoute {
        /// Route method.
        method: String,
        /// Route pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The filter chain is mis-ordered.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// A startup or shutdown hook failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ServerError {
    pub(crate) fn invalid_route(
        method: impl Into<String>,
        pattern: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRoute {
            method: method.into(),
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}
