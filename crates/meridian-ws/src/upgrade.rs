//! WebSocket upgrade detection and handshake.
//!
//! The server answers an upgrade request with `101 Switching Protocols`
//! built here, then hands the upgraded connection to
//! [`WebSocket::accept`](crate::WebSocket::accept).

use base64::Engine;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{WsError, WsResult};

/// The WebSocket GUID used in the handshake (RFC 6455).
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Supported WebSocket protocol version.
const WEBSOCKET_VERSION: &str = "13";

/// Returns true if the headers ask for an upgrade to `websocket`.
///
/// Only the `Upgrade` header is consulted. A request that claims an
/// upgrade but fails the handshake checks is rejected later by
/// [`validate_upgrade_request`].
pub fn is_websocket_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"))
}

fn has_connection_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// Compute the `Sec-WebSocket-Accept` value for a client key.
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    let result = hasher.finalize();
    base64::engine::general_purpose::STANDARD.encode(result)
}

/// Validates a WebSocket upgrade request and returns the accept key.
///
/// # Errors
///
/// Returns [`WsError::NotWebSocketRequest`] naming the first missing or
/// invalid handshake header.
pub fn validate_upgrade_request(headers: &HeaderMap) -> WsResult<String> {
    if !is_websocket_request(headers) {
        return Err(WsError::not_websocket("missing 'Upgrade: websocket' header"));
    }
    if !has_connection_upgrade(headers) {
        return Err(WsError::not_websocket("missing 'Connection: Upgrade' header"));
    }

    let version = headers
        .get(header::SEC_WEBSOCKET_VERSION)
        .and_then(|v| v.to_str().ok());
    if version != Some(WEBSOCKET_VERSION) {
        return Err(WsError::not_websocket(format!(
            "unsupported Sec-WebSocket-Version (expected {WEBSOCKET_VERSION})"
        )));
    }

    let key = headers
        .get(header::SEC_WEBSOCKET_KEY)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WsError::not_websocket("missing Sec-WebSocket-Key header"))?;

    let accept = compute_accept_key(key.trim());
    debug!(accept_key = %accept, "websocket upgrade validated");
    Ok(accept)
}

/// Builds the `101 Switching Protocols` response for an accept key.
///
/// # Errors
///
/// Returns [`WsError::HandshakeFailed`] if the key is not a valid header value.
pub fn upgrade_response(accept_key: &str) -> WsResult<Response<Full<Bytes>>> {
    let accept = HeaderValue::from_str(accept_key)
        .map_err(|e| WsError::handshake_failed(e.to_string()))?;

    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);
    Ok(response)
}
