//! The buffered response.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

/// A buffered response whose status line and headers are committed once.
///
/// A status of `0` and an empty content type mean "unset": the first call to
/// [`write_header`](Self::write_header) fills them from the supplied defaults.
/// After that the head is frozen and further header writes are ignored with a
/// warning.
#[derive(Debug, Default)]
pub struct Response {
    status: u16,
    content_type: String,
    headers: HeaderMap,
    body: BytesMut,
    header_written: bool,
}

impl Response {
    /// Creates an empty response with status and content type unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the status, `0` while unset.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Sets the status. Ignored once the header is written.
    pub fn set_status(&mut self, status: u16) {
        if self.header_written {
            tracing::warn!(status, "status set after response header was written");
            return;
        }
        self.status = status;
    }

    /// Returns the content type, empty while unset.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sets the content type. Ignored once the header is written.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        if self.header_written {
            tracing::warn!("content type set after response header was written");
            return;
        }
        self.content_type = content_type.into();
    }

    /// Returns the extra response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Adds a header. Returns `false` if the header was already written.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.header_written {
            tracing::warn!(header = %name, "header set after response header was written");
            return false;
        }
        self.headers.insert(name, value);
        true
    }

    /// Commits the status and content type, using the defaults for unset values.
    pub fn write_header(&mut self, default_status: u16, default_content_type: &str) {
        if self.header_written {
            tracing::warn!(
                status = self.status,
                "response header already written, ignoring"
            );
            return;
        }
        if self.status == 0 {
            self.status = default_status;
        }
        if self.content_type.is_empty() {
            self.content_type = default_content_type.to_string();
        }
        self.header_written = true;
    }

    /// Returns `true` once the header has been committed.
    pub fn is_header_written(&self) -> bool {
        self.header_written
    }

    /// Appends to the body, committing a `200 text/html` header first if needed.
    pub fn write(&mut self, data: &[u8]) {
        if !self.header_written {
            self.write_header(200, "text/html; charset=utf-8");
        }
        self.body.extend_from_slice(data);
    }

    /// Returns the body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts into an `http::Response`.
    ///
    /// An unset status becomes `200`. A status outside the valid range
    /// becomes `500`.
    #[must_use]
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let status = match self.status {
            0 => StatusCode::OK,
            code => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        };
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        if !self.content_type.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&self.content_type) {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_header_uses_defaults() {
        let mut resp = Response::new();
        resp.write_header(404, "text/plain");
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.content_type(), "text/plain");
    }

    #[test]
    fn test_write_header_keeps_explicit_values() {
        let mut resp = Response::new();
        resp.set_status(201);
        resp.set_content_type("application/json");
        resp.write_header(200, "text/html");
        assert_eq!(resp.status(), 201);
        assert_eq!(resp.content_type(), "application/json");
    }

    #[test]
    fn test_header_written_once() {
        let mut resp = Response::new();
        resp.write_header(200, "text/html");
        resp.write_header(500, "text/plain");
        resp.set_status(418);
        assert_eq!(resp.status(), 200);
        assert!(!resp.insert_header(
            HeaderName::from_static("x-late"),
            HeaderValue::from_static("1")
        ));
    }

    #[test]
    fn test_write_commits_header() {
        let mut resp = Response::new();
        resp.write(b"hello");
        assert!(resp.is_header_written());
        assert_eq!(resp.status(), 200);

        let http_resp = resp.into_http();
        assert_eq!(http_resp.status(), StatusCode::OK);
        assert_eq!(
            http_resp.headers()[CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn test_invalid_status_maps_to_500() {
        let mut resp = Response::new();
        resp.set_status(42);
        assert_eq!(
            resp.into_http().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
