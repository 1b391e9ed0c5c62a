//! Per-request state carried through the filter chain.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use bytes::Bytes;
use http::Extensions;
use http_body_util::Full;
use meridian_core::outcome::{ErrorOutcome, Json, Redirect, Text};
use meridian_core::{BoxOutcome, ErrorDescription, Outcome, Request, RequestId, Response};
use meridian_extract::Params;
use meridian_i18n::{format_message, MessageCatalog};
use meridian_ws::{WebSocket, WS_METHOD};
use serde::Serialize;

use crate::action::Action;

/// Values exposed to rendering, keyed by name.
pub type RenderArgs = HashMap<String, serde_json::Value>;

/// The context every filter and action works on.
///
/// A controller is created per request and owned by the task serving it.
/// It holds the request, the response being built, the unified parameters,
/// the routed action and the outcome that will be rendered when the chain
/// finishes.
pub struct Controller {
    request: Request,
    response: Response,
    params: Params,
    action: Option<Arc<Action>>,
    outcome: Option<BoxOutcome>,
    render_args: RenderArgs,
    websocket: Option<WebSocket>,
    request_id: RequestId,
    catalog: Arc<MessageCatalog>,
    dev_mode: bool,
    extensions: Extensions,
}

impl Controller {
    /// Creates a controller for `request`.
    #[must_use]
    pub fn new(request: Request, params: Params) -> Self {
        Self {
            request,
            response: Response::new(),
            params,
            action: None,
            outcome: None,
            render_args: RenderArgs::new(),
            websocket: None,
            request_id: RequestId::new(),
            catalog: Arc::new(MessageCatalog::default()),
            dev_mode: false,
            extensions: Extensions::new(),
        }
    }

    /// Uses `catalog` for [`message`](Self::message) lookups.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<MessageCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Marks the controller as running in development mode.
    #[must_use]
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Attaches the upgraded socket of a WebSocket request.
    #[must_use]
    pub fn with_websocket(mut self, websocket: WebSocket) -> Self {
        self.websocket = Some(websocket);
        self
    }

    /// Overrides the generated request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub(crate) fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Returns the response.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Returns the response for direct status and body writes.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Returns the unified parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the parameters for binding.
    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub(crate) fn request_and_params(&mut self) -> (&Request, &mut Params) {
        (&self.request, &mut self.params)
    }

    /// Returns the request id.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns true in development mode.
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Returns the routed action.
    pub fn action(&self) -> Option<&Arc<Action>> {
        self.action.as_ref()
    }

    /// Returns the routed action's name, if any.
    pub fn action_name(&self) -> Option<&str> {
        self.action.as_deref().map(Action::name)
    }

    /// Sets the action the invoker will call.
    pub fn set_action(&mut self, action: Arc<Action>) {
        self.action = Some(action);
    }

    /// Returns the current outcome.
    pub fn outcome(&self) -> Option<&dyn Outcome> {
        self.outcome.as_deref()
    }

    /// Returns true if an outcome has been set.
    pub fn has_outcome(&self) -> bool {
        self.outcome.is_some()
    }

    /// Replaces the outcome.
    pub fn set_outcome(&mut self, outcome: impl Outcome + 'static) {
        self.outcome = Some(Box::new(outcome));
    }

    /// Replaces the outcome with an already boxed one.
    pub fn set_boxed_outcome(&mut self, outcome: BoxOutcome) {
        self.outcome = Some(outcome);
    }

    /// Removes and returns the outcome.
    pub fn take_outcome(&mut self) -> Option<BoxOutcome> {
        self.outcome.take()
    }

    /// Returns the render arguments.
    pub fn render_args(&self) -> &RenderArgs {
        &self.render_args
    }

    /// Returns the render arguments for modification.
    pub fn render_args_mut(&mut self) -> &mut RenderArgs {
        &mut self.render_args
    }

    /// Returns true if this request arrived as a WebSocket upgrade.
    pub fn is_websocket(&self) -> bool {
        self.request.method().as_str() == WS_METHOD
    }

    /// Returns the upgraded socket, if it has not been handed out yet.
    pub fn websocket(&self) -> Option<&WebSocket> {
        self.websocket.as_ref()
    }

    /// Takes the upgraded socket.
    pub fn take_websocket(&mut self) -> Option<WebSocket> {
        self.websocket.take()
    }

    /// Returns typed per-request extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns typed per-request extensions for modification.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Resolves `key` in the request locale.
    ///
    /// Unresolvable keys come back as `??? key ???`.
    pub fn message(&self, key: &str, args: &[&dyn Display]) -> String {
        self.catalog.message(self.request.locale(), key, args)
    }

    /// Returns the message catalog.
    pub fn catalog(&self) -> &Arc<MessageCatalog> {
        &self.catalog
    }

    /// A plain-text outcome, formatted with `%s`/`%d`/`%v` placeholders.
    pub fn render_text(&self, template: &str, args: &[&dyn Display]) -> Text {
        Text::new(format_message(template, args))
    }

    /// A JSON outcome.
    ///
    /// A value that fails to serialize becomes a `500` error outcome.
    pub fn render_json<T: Serialize>(&self, value: &T) -> BoxOutcome {
        match Json::new(value) {
            Ok(json) => Box::new(json),
            Err(err) => {
                tracing::error!(request_id = %self.request_id, error = %err, "failed to serialize json outcome");
                Box::new(
                    ErrorOutcome::new(ErrorDescription::new("Serialization Error", err.to_string()))
                        .expose_stack(self.dev_mode),
                )
            }
        }
    }

    /// A `302` redirect outcome.
    pub fn redirect(&self, location: impl Into<String>) -> Redirect {
        Redirect::to(location)
    }

    /// A `404` outcome for this request's path.
    pub fn not_found(&self, message: impl Into<String>) -> ErrorOutcome {
        ErrorOutcome::new(ErrorDescription::not_found(message).with_path(self.request.path()))
            .with_status(404)
    }

    /// Renders the controller into an HTTP response.
    ///
    /// The outcome, if any, is applied. Otherwise a status written directly
    /// to the response is flushed as is.
    pub fn finish(self) -> http::Response<Full<Bytes>> {
        let Controller {
            request,
            mut response,
            outcome,
            ..
        } = self;

        match outcome {
            Some(outcome) => outcome.apply(&request, &mut response),
            None if !response.is_header_written() && response.status() != 0 => {
                response.write_header(200, "");
            }
            None => {}
        }
        response.into_http()
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("request_id", &self.request_id)
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("action", &self.action_name())
            .field("has_outcome", &self.outcome.is_some())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use meridian_extract::{Binders, Values};
    use meridian_i18n::MessageFile;

    pub(crate) fn controller(uri: &str) -> Controller {
        controller_from(http::Request::get(uri).body(Bytes::new()).unwrap())
    }

    pub(crate) fn controller_from(req: http::Request<Bytes>) -> Controller {
        Controller::new(
            Request::from_http(req),
            Params::new(Arc::new(Binders::default())),
        )
    }

    async fn body_of(response: http::Response<Full<Bytes>>) -> String {
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_finish_applies_outcome() {
        let mut c = controller("/");
        c.set_outcome(Text::new("hi").with_status(201));
        let response = c.finish();
        assert_eq!(response.status(), 201);
        assert_eq!(body_of(response).await, "hi");
    }

    #[tokio::test]
    async fn test_finish_flushes_raw_status() {
        let mut c = controller("/");
        c.response_mut().set_status(204);
        let response = c.finish();
        assert_eq!(response.status(), 204);
        assert_eq!(body_of(response).await, "");
    }

    #[test]
    fn test_message_uses_request_locale() {
        let mut file = MessageFile::new();
        file.insert("DEFAULT", "greeting", "Bonjour %s");
        let mut catalog = MessageCatalog::new(None);
        catalog.insert("fr", file);

        let mut c = controller("/").with_catalog(Arc::new(catalog));
        c.request_mut().set_locale("fr-CA");
        assert_eq!(c.message("greeting", &[&"Ana"]), "Bonjour Ana");
        assert_eq!(c.message("farewell", &[]), "??? farewell ???");
    }

    #[test]
    fn test_outcome_helpers() {
        let mut c = controller("/missing");
        assert!(!c.has_outcome());

        let not_found = c.not_found("no such page");
        assert_eq!(not_found.status(), 404);
        assert_eq!(not_found.error().path(), Some("/missing"));

        c.set_outcome(c.render_text("%d items", &[&3]));
        assert!(c.has_outcome());
        assert!(c.take_outcome().is_some());
        assert!(!c.has_outcome());
    }

    #[test]
    fn test_websocket_detection_uses_method() {
        let req = http::Request::builder()
            .method(http::Method::from_bytes(WS_METHOD.as_bytes()).unwrap())
            .uri("/chat")
            .body(Bytes::new())
            .unwrap();
        assert!(controller_from(req).is_websocket());
        assert!(!controller("/chat").is_websocket());
    }

    #[test]
    fn test_params_are_reachable() {
        let mut c = controller("/");
        c.params_mut()
            .set_route(Values::from([("id".to_string(), vec!["7".to_string()])]));
        assert_eq!(c.params().get("id"), Some("7"));
    }
}
