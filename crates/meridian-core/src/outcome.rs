//! The outcome capability and its built-in implementations.
//!
//! An [`Outcome`] is what an action (or a filter) leaves behind for the server
//! loop. After the filter chain finishes the server calls
//! [`Outcome::apply`] exactly once to write the response.
//!
//! Actions may return anything implementing [`IntoOutcome`]: `()`, any
//! `Outcome`, a boxed outcome, or an `Option` of either. `None` and `()` leave
//! whatever outcome an earlier stage set untouched.

use http::header::{HeaderValue, LOCATION};
use serde::Serialize;

use crate::error::ErrorDescription;
use crate::format::Format;
use crate::request::Request;
use crate::response::Response;

/// Something that knows how to write itself to a response.
pub trait Outcome: Send + Sync {
    /// Writes status, headers and body for `request` into `response`.
    fn apply(&self, request: &Request, response: &mut Response);
}

/// A type-erased outcome.
pub type BoxOutcome = Box<dyn Outcome>;

/// Conversion from an action's return value into an optional outcome.
pub trait IntoOutcome {
    /// Returns the outcome to store, or `None` to keep the current one.
    fn into_outcome(self) -> Option<BoxOutcome>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Option<BoxOutcome> {
        None
    }
}

impl<T: Outcome + 'static> IntoOutcome for T {
    fn into_outcome(self) -> Option<BoxOutcome> {
        Some(Box::new(self))
    }
}

impl IntoOutcome for BoxOutcome {
    fn into_outcome(self) -> Option<BoxOutcome> {
        Some(self)
    }
}

impl IntoOutcome for Option<BoxOutcome> {
    fn into_outcome(self) -> Option<BoxOutcome> {
        self
    }
}

impl<T: Outcome + 'static> IntoOutcome for Option<T> {
    fn into_outcome(self) -> Option<BoxOutcome> {
        self.map(|outcome| Box::new(outcome) as BoxOutcome)
    }
}

/// A plain-text body.
#[derive(Debug, Clone)]
pub struct Text {
    body: String,
    status: u16,
}

impl Text {
    /// Creates a `200 text/plain` outcome.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            status: 200,
        }
    }

    /// Overrides the status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

impl Outcome for Text {
    fn apply(&self, _request: &Request, response: &mut Response) {
        response.write_header(self.status, Format::Txt.content_type());
        response.write(self.body.as_bytes());
    }
}

/// A pre-rendered HTML body.
#[derive(Debug, Clone)]
pub struct Html {
    body: String,
    status: u16,
}

impl Html {
    /// Creates a `200 text/html` outcome.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            status: 200,
        }
    }

    /// Overrides the status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

impl Outcome for Html {
    fn apply(&self, _request: &Request, response: &mut Response) {
        response.write_header(self.status, Format::Html.content_type());
        response.write(self.body.as_bytes());
    }
}

/// A JSON body.
#[derive(Debug, Clone)]
pub struct Json {
    body: Vec<u8>,
    status: u16,
}

impl Json {
    /// Serializes `value` into a `200 application/json` outcome.
    pub fn new<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: serde_json::to_vec(value)?,
            status: 200,
        })
    }

    /// Wraps an already-built JSON value.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            body: value.to_string().into_bytes(),
            status: 200,
        }
    }

    /// Overrides the status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

impl Outcome for Json {
    fn apply(&self, _request: &Request, response: &mut Response) {
        response.write_header(self.status, Format::Json.content_type());
        response.write(&self.body);
    }
}

/// A `302 Found` redirect.
#[derive(Debug, Clone)]
pub struct Redirect {
    location: String,
}

impl Redirect {
    /// Redirects to `location`.
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

impl Outcome for Redirect {
    fn apply(&self, _request: &Request, response: &mut Response) {
        match HeaderValue::from_str(&self.location) {
            Ok(value) => {
                response.insert_header(LOCATION, value);
                response.write_header(302, "");
            }
            Err(_) => {
                tracing::warn!(location = %self.location, "invalid redirect location");
                response.write_header(500, Format::Txt.content_type());
            }
        }
    }
}

/// Renders an [`ErrorDescription`] in the request's negotiated format.
///
/// The stack trace is included in the body only when
/// [`expose_stack`](Self::expose_stack) was set, which the panic guard does in
/// dev mode.
#[derive(Debug, Clone)]
pub struct ErrorOutcome {
    error: ErrorDescription,
    status: u16,
    expose_stack: bool,
}

impl ErrorOutcome {
    /// Creates a `500` error outcome.
    #[must_use]
    pub fn new(error: ErrorDescription) -> Self {
        Self {
            error,
            status: 500,
            expose_stack: false,
        }
    }

    /// Creates a `404` error outcome.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorDescription::not_found(message)).with_status(404)
    }

    /// Overrides the status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Includes the stack trace in the rendered body.
    #[must_use]
    pub fn expose_stack(mut self, expose: bool) -> Self {
        self.expose_stack = expose;
        self
    }

    /// Returns the described error.
    pub fn error(&self) -> &ErrorDescription {
        &self.error
    }

    /// Returns the status this outcome writes.
    pub fn status(&self) -> u16 {
        self.status
    }

    fn render(&self, format: Format) -> String {
        let error = if self.expose_stack {
            self.error.clone()
        } else {
            self.error.without_stack()
        };
        match format {
            Format::Json => serde_json::json!({ "error": error }).to_string(),
            Format::Txt => match error.stack() {
                Some(stack) => format!("{error}\n\n{stack}"),
                None => error.to_string(),
            },
            Format::Xml => {
                let mut body = format!(
                    "<error><kind>{}</kind><message>{}</message>",
                    escape(error.kind()),
                    escape(error.message())
                );
                if let Some(stack) = error.stack() {
                    body.push_str(&format!("<stack>{}</stack>", escape(stack)));
                }
                body.push_str("</error>");
                body
            }
            Format::Html => {
                let mut body = format!(
                    "<!DOCTYPE html><html><head><title>{kind}</title></head><body><h1>{kind}</h1><p>{message}</p>",
                    kind = escape(error.kind()),
                    message = escape(error.message())
                );
                if let Some(stack) = error.stack() {
                    body.push_str(&format!("<pre>{}</pre>", escape(stack)));
                }
                body.push_str("</body></html>");
                body
            }
        }
    }
}

impl Outcome for ErrorOutcome {
    fn apply(&self, request: &Request, response: &mut Response) {
        let format = request.format();
        response.write_header(self.status, format.content_type());
        response.write(self.render(format).as_bytes());
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn request_accepting(accept: &'static str) -> Request {
        Request::from_http(
            http::Request::builder()
                .header("Accept", accept)
                .body(Bytes::new())
                .unwrap(),
        )
    }

    fn body(resp: &Response) -> String {
        String::from_utf8(resp.body().to_vec()).unwrap()
    }

    #[test]
    fn test_into_outcome_shapes() {
        assert!(().into_outcome().is_none());
        assert!(Text::new("x").into_outcome().is_some());
        assert!(Option::<Text>::None.into_outcome().is_none());
        assert!(Some(Text::new("x")).into_outcome().is_some());
        let boxed: BoxOutcome = Box::new(Text::new("x"));
        assert!(boxed.into_outcome().is_some());
    }

    #[test]
    fn test_text_outcome() {
        let req = request_accepting("*/*");
        let mut resp = Response::new();
        Text::new("hi").with_status(202).apply(&req, &mut resp);
        assert_eq!(resp.status(), 202);
        assert_eq!(resp.content_type(), "text/plain; charset=utf-8");
        assert_eq!(body(&resp), "hi");
    }

    #[test]
    fn test_json_outcome() {
        let req = request_accepting("application/json");
        let mut resp = Response::new();
        Json::new(&serde_json::json!({"ok": true}))
            .unwrap()
            .apply(&req, &mut resp);
        assert_eq!(resp.content_type(), "application/json; charset=utf-8");
        assert_eq!(body(&resp), r#"{"ok":true}"#);
    }

    #[test]
    fn test_redirect_outcome() {
        let req = request_accepting("*/*");
        let mut resp = Response::new();
        Redirect::to("/login").apply(&req, &mut resp);
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers()[LOCATION], "/login");
    }

    #[test]
    fn test_error_outcome_follows_format() {
        let error = ErrorDescription::new("Panic", "a < b").with_stack("frame 0");

        let mut resp = Response::new();
        ErrorOutcome::new(error.clone()).apply(&request_accepting("application/json"), &mut resp);
        assert_eq!(resp.status(), 500);
        let json: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(json["error"]["kind"], "Panic");
        assert!(json["error"].get("stack").is_none());

        let mut resp = Response::new();
        ErrorOutcome::new(error)
            .expose_stack(true)
            .apply(&request_accepting("text/html"), &mut resp);
        let html = body(&resp);
        assert!(html.contains("a &lt; b"));
        assert!(html.contains("<pre>frame 0</pre>"));
    }

    #[test]
    fn test_not_found_outcome() {
        let mut resp = Response::new();
        ErrorOutcome::not_found("no route").apply(&request_accepting("text/plain"), &mut resp);
        assert_eq!(resp.status(), 404);
        assert_eq!(body(&resp), "Not Found: no route");
    }
}
