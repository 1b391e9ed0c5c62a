//! The inbound request wrapper.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};

use crate::accept_language::{resolve_accept_language, AcceptLanguages};
use crate::format::{resolve_content_type, resolve_format, Format};

/// An inbound request with its negotiated attributes.
///
/// The content type, format and accept-language list are computed once at
/// construction. The locale starts empty and is set by the i18n stage before any
/// action runs.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use meridian_core::{Format, Request};
///
/// let http_req = http::Request::builder()
///     .uri("/users?page=2")
///     .header("Accept", "application/json")
///     .body(Bytes::new())
///     .unwrap();
///
/// let req = Request::from_http(http_req);
/// assert_eq!(req.format(), Format::Json);
/// assert_eq!(req.content_type(), "text/html");
/// assert_eq!(req.query(), Some("page=2"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    content_type: String,
    format: Format,
    accept_languages: AcceptLanguages,
    locale: String,
}

impl Request {
    /// Builds a request from its HTTP head and a fully read body.
    #[must_use]
    pub fn new(parts: http::request::Parts, body: Bytes) -> Self {
        let content_type = resolve_content_type(&parts.headers);
        let format = resolve_format(&parts.headers);
        let accept_languages = resolve_accept_language(&parts.headers);
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            remote_addr: None,
            content_type,
            format,
            accept_languages,
            locale: String::new(),
        }
    }

    /// Builds a request from an `http::Request` with a buffered body.
    #[must_use]
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }

    /// Records the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Returns the effective method. Upgraded sockets report `WS`.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Overrides the effective method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the URI path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the buffered body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the peer address, when known.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the negotiated media type (lowercase, no parameters).
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the negotiated response format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the parsed `Accept-Language` ranges, best first.
    pub fn accept_languages(&self) -> &AcceptLanguages {
        &self.accept_languages
    }

    /// Returns the resolved locale, empty when none was found.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Sets the resolved locale.
    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiated_attributes() {
        let http_req = http::Request::builder()
            .method(Method::POST)
            .uri("/submit")
            .header("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")
            .header("Accept", "text/plain")
            .header("Accept-Language", "fr;q=0.4, de")
            .body(Bytes::from_static(b"a=1"))
            .unwrap();
        let req = Request::from_http(http_req);

        assert_eq!(req.content_type(), "application/x-www-form-urlencoded");
        assert_eq!(req.format(), Format::Txt);
        assert_eq!(req.accept_languages().preferred(), Some("de"));
        assert_eq!(req.locale(), "");
        assert_eq!(req.body().as_ref(), b"a=1");
    }

    #[test]
    fn test_ws_method_override() {
        let mut req = Request::from_http(http::Request::new(Bytes::new()));
        let ws = Method::from_bytes(b"WS").unwrap();
        req.set_method(ws.clone());
        assert_eq!(req.method(), &ws);
    }
}
