//! Request routing.
//!
//! The [`Router`] trait is the seam between the server and whatever maps
//! requests to actions. [`RouteTable`] is a small ordered implementation
//! with `{name}` path parameters, per-route fixed parameters and the `WS`
//! pseudo-method for upgraded sockets. [`RouterFilter`] runs the router at
//! the head of the filter chain.
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian_server::RouteTable;
//! use meridian_middleware::Action;
//!
//! let mut routes = RouteTable::new();
//! routes
//!     .add("GET", "/hotels/{id}", Action::new("Hotels.show", &["id"], show)?)?
//!     .add_fixed("GET", "/", Action::new("Hotels.list", &["page"], list)?, &[("page", "1")])?
//!     .add("WS", "/hotels/{id}/feed", Action::new("Hotels.feed", &["id", "ws"], feed)?)?;
//! ```

use std::fmt;
use std::sync::Arc;

use http::Method;
use meridian_extract::Values;
use meridian_middleware::{Action, BoxFuture, Controller, Filter, Next};

use crate::error::ServerError;

/// The result of routing a request.
#[derive(Clone)]
pub struct RouteMatch {
    action: Arc<Action>,
    fixed: Values,
    route: Values,
}

impl RouteMatch {
    /// Creates a match.
    #[must_use]
    pub fn new(action: Arc<Action>, fixed: Values, route: Values) -> Self {
        Self {
            action,
            fixed,
            route,
        }
    }

    /// Returns the action to invoke.
    #[must_use]
    pub fn action(&self) -> &Arc<Action> {
        &self.action
    }

    /// Returns the parameters fixed by the route declaration.
    #[must_use]
    pub fn fixed(&self) -> &Values {
        &self.fixed
    }

    /// Returns the parameters captured from the path.
    #[must_use]
    pub fn route(&self) -> &Values {
        &self.route
    }

    /// Returns a captured path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route.get(name).and_then(|v| v.first()).map(String::as_str)
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("action", &self.action.name())
            .field("fixed", &self.fixed)
            .field("route", &self.route)
            .finish()
    }
}

/// Maps a request to an action.
pub trait Router: Send + Sync + 'static {
    /// Returns the match for `method` and `path`, or `None` for a 404.
    ///
    /// Upgraded sockets arrive with the `WS` method.
    fn route(&self, method: &Method, path: &str) -> Option<RouteMatch>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
enum RouteMethod {
    Any,
    Exact(Method),
}

impl RouteMethod {
    fn matches(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == method,
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(method) => f.write_str(method.as_str()),
        }
    }
}

struct Route {
    method: RouteMethod,
    pattern: String,
    segments: Vec<PathSegment>,
    action: Arc<Action>,
    fixed: Values,
}

impl Route {
    fn match_path(&self, path: &str) -> Option<Values> {
        let mut actual = path.split('/').filter(|s| !s.is_empty());
        let mut params = Values::new();

        for segment in &self.segments {
            let value = actual.next()?;
            match segment {
                PathSegment::Literal(expected) if expected == value => {}
                PathSegment::Literal(_) => return None,
                PathSegment::Param(name) => {
                    params.entry(name.clone()).or_default().push(value.to_string());
                }
            }
        }

        if actual.next().is_some() {
            return None;
        }
        Some(params)
    }
}

fn parse_method(method: &str, pattern: &str) -> Result<RouteMethod, ServerError> {
    if method == "*" {
        return Ok(RouteMethod::Any);
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map(RouteMethod::Exact)
        .map_err(|e| ServerError::invalid_route(method, pattern, e.to_string()))
}

fn parse_segments(method: &str, pattern: &str) -> Result<Vec<PathSegment>, ServerError> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{') {
            Some(rest) => match rest.strip_suffix('}') {
                Some(name) if !name.is_empty() && !name.contains(['{', '}']) => {
                    Ok(PathSegment::Param(name.to_string()))
                }
                Some(_) => Err(ServerError::invalid_route(method, pattern, "empty or nested parameter name")),
                None => Err(ServerError::invalid_route(method, pattern, "unclosed parameter")),
            },
            None if s.contains(['{', '}']) => Err(ServerError::invalid_route(
                method,
                pattern,
                "parameters must span a whole segment",
            )),
            None => Ok(PathSegment::Literal(s.to_string())),
        })
        .collect()
}

/// An ordered route list. The first matching route wins.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route.
    ///
    /// `method` is an HTTP method, `WS` or `*` for any method.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidRoute`] for an invalid method or a
    /// malformed `{name}` segment.
    pub fn add(&mut self, method: &str, pattern: &str, action: Action) -> Result<&mut Self, ServerError> {
        self.add_fixed(method, pattern, action, &[])
    }

    /// Adds a route that also supplies fixed parameter values.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    pub fn add_fixed(
        &mut self,
        method: &str,
        pattern: &str,
        action: Action,
        fixed: &[(&str, &str)],
    ) -> Result<&mut Self, ServerError> {
        let route_method = parse_method(method, pattern)?;
        let segments = parse_segments(method, pattern)?;

        let mut values = Values::new();
        for (name, value) in fixed {
            values.entry((*name).to_string()).or_default().push((*value).to_string());
        }

        tracing::debug!(method = %route_method, pattern, action = action.name(), "route registered");
        self.routes.push(Route {
            method: route_method,
            pattern: pattern.to_string(),
            segments,
            action: Arc::new(action),
            fixed: values,
        });
        Ok(self)
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Lists `(method, pattern, action)` in match order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, &str, &str)> {
        self.routes
            .iter()
            .map(|r| (r.method.to_string(), r.pattern.as_str(), r.action.name()))
            .collect()
    }
}

impl Router for RouteTable {
    fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|r| r.method.matches(method))
            .find_map(|r| {
                r.match_path(path)
                    .map(|params| RouteMatch::new(Arc::clone(&r.action), r.fixed.clone(), params))
            })
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries()).finish()
    }
}

/// Resolves the action at the head of the chain.
///
/// On a match the fixed and route parameters are stored and the action is
/// set. On a miss a `404` outcome is set and the chain stops.
pub struct RouterFilter {
    router: Arc<dyn Router>,
}

impl RouterFilter {
    /// Creates the filter.
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self { router }
    }
}

impl Filter for RouterFilter {
    fn name(&self) -> &'static str {
        "router"
    }

    fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let found = self.router.route(c.request().method(), c.request().path());
            match found {
                Some(RouteMatch {
                    action,
                    fixed,
                    route,
                }) => {
                    c.params_mut().set_fixed(fixed);
                    c.params_mut().set_route(route);
                    c.set_action(action);
                    next.run(c).await;
                }
                None => {
                    tracing::debug!(
                        request_id = %c.request_id(),
                        method = %c.request().method(),
                        path = c.request().path(),
                        "no route matched"
                    );
                    let message = format!("no route for {} {}", c.request().method(), c.request().path());
                    let outcome = c.not_found(message);
                    c.set_outcome(outcome);
                }
            }
        })
    }
}

impl fmt::Debug for RouterFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterFilter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::outcome::Text;

    fn action(name: &str) -> Action {
        Action::new(name, &[], |_c: &mut Controller| Text::new("ok")).unwrap()
    }

    fn table() -> RouteTable {
        let mut routes = RouteTable::new();
        routes
            .add("GET", "/hotels", action("Hotels.list"))
            .unwrap()
            .add("GET", "/hotels/{id}", action("Hotels.show"))
            .unwrap()
            .add("POST", "/hotels/{id}/book", action("Hotels.book"))
            .unwrap()
            .add_fixed("GET", "/", action("App.index"), &[("page", "home")])
            .unwrap()
            .add("WS", "/feed/{topic}", action("Feed.subscribe"))
            .unwrap()
            .add("*", "/ping", action("App.ping"))
            .unwrap();
        routes
    }

    fn ws() -> Method {
        Method::from_bytes(b"WS").unwrap()
    }

    #[test]
    fn test_literal_and_param_routes() {
        let routes = table();
        let m = routes.route(&Method::GET, "/hotels").unwrap();
        assert_eq!(m.action().name(), "Hotels.list");
        assert!(m.route().is_empty());

        let m = routes.route(&Method::GET, "/hotels/42/").unwrap();
        assert_eq!(m.action().name(), "Hotels.show");
        assert_eq!(m.param("id"), Some("42"));
    }

    #[test]
    fn test_method_must_match() {
        let routes = table();
        assert!(routes.route(&Method::GET, "/hotels/42/book").is_none());
        assert_eq!(
            routes.route(&Method::POST, "/hotels/42/book").unwrap().action().name(),
            "Hotels.book"
        );
        assert_eq!(routes.route(&Method::DELETE, "/ping").unwrap().action().name(), "App.ping");
    }

    #[test]
    fn test_fixed_params() {
        let m = table().route(&Method::GET, "/").unwrap();
        assert_eq!(m.fixed().get("page"), Some(&vec!["home".to_string()]));
    }

    #[test]
    fn test_ws_pseudo_method() {
        let routes = table();
        assert!(routes.route(&Method::GET, "/feed/news").is_none());
        let m = routes.route(&ws(), "/feed/news").unwrap();
        assert_eq!(m.action().name(), "Feed.subscribe");
        assert_eq!(m.param("topic"), Some("news"));
    }

    #[test]
    fn test_segment_count_mismatch() {
        let routes = table();
        assert!(routes.route(&Method::GET, "/hotels/1/2").is_none());
        assert!(routes.route(&Method::GET, "/nowhere").is_none());
    }

    #[test]
    fn test_invalid_routes_rejected() {
        let mut routes = RouteTable::new();
        assert!(routes.add("GET", "/a/{id", action("x")).is_err());
        assert!(routes.add("GET", "/a/{}", action("x")).is_err());
        assert!(routes.add("GET", "/a/x{id}", action("x")).is_err());
        assert!(routes.add("BAD METHOD", "/a", action("x")).is_err());
        assert!(routes.is_empty());
    }

    #[test]
    fn test_entries_listing() {
        let routes = table();
        assert_eq!(routes.len(), 6);
        assert_eq!(
            routes.entries()[1],
            ("GET".to_string(), "/hotels/{id}", "Hotels.show")
        );
        assert_eq!(routes.entries()[5].0, "*");
    }
}
