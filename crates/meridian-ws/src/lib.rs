//! WebSocket support for Meridian.
//!
//! This crate covers the two halves of a socket action:
//!
//! - [`upgrade`]: detecting an upgrade request and answering the handshake
//! - [`WebSocket`]: the connection passed to actions that declare a socket
//!   argument
//!
//! Requests are detected with [`is_websocket_request`]; the server then
//! dispatches them through the filter chain under the `WS` method.

mod connection;
mod error;
pub mod upgrade;

pub use connection::{SocketIo, WebSocket, WebSocketSender};
pub use error::{WsError, WsResult};
pub use tungstenite::Message;
pub use upgrade::{
    compute_accept_key, is_websocket_request, upgrade_response, validate_upgrade_request,
};

/// The pseudo-method WebSocket requests are routed under.
pub const WS_METHOD: &str = "WS";
