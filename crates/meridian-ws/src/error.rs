//! Error types for WebSocket operations.

use thiserror::Error;

/// Result type for WebSocket operations.
pub type WsResult<T> = Result<T, WsError>;

/// Errors that can occur while upgrading or driving a WebSocket.
#[derive(Debug, Error)]
pub enum WsError {
    /// The HTTP request was not a valid WebSocket upgrade request.
    #[error("not a WebSocket upgrade request: {reason}")]
    NotWebSocketRequest {
        /// Reason why the request is not a valid WebSocket upgrade.
        reason: String,
    },

    /// The handshake response could not be built.
    #[error("WebSocket handshake failed: {0}")]
    HandshakeFailed(String),

    /// The connection was already closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tungstenite::Error),
}

impl WsError {
    /// Create a new "not a WebSocket request" error.
    pub fn not_websocket(reason: impl Into<String>) -> Self {
        Self::NotWebSocketRequest {
            reason: reason.into(),
        }
    }

    /// Create a new handshake failed error.
    pub fn handshake_failed(reason: impl Into<String>) -> Self {
        Self::HandshakeFailed(reason.into())
    }

    /// Returns true if the error means the peer is gone.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed
                | Self::Tungstenite(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
                )
        )
    }
}
