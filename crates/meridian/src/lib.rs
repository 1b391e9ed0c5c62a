//! # Meridian
//!
//! A request-lifecycle web framework: every request flows through a chain
//! of filters that resolve its locale, unify its parameters, guard against
//! faults and finally invoke a routed action.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meridian::prelude::*;
//!
//! fn hello(c: &mut Controller, name: String) -> Text {
//!     Text::new(c.message("greeting", &[&name]))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("conf/app.toml")?
//!         .with_default_env()
//!         .load()?;
//!     init_logging(&config.logging)?;
//!
//!     let mut routes = RouteTable::new();
//!     routes.add("GET", "/hello", Action::new("App.hello", &["name"], hello)?)?;
//!
//!     Server::builder()
//!         .with_config(&config)
//!         .router(routes)
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## The chain
//!
//! ```text
//! Router → I18n → Params → Panic → [your filters] → Invoker → Action
//! ```
//!
//! Any filter may set an outcome and return without continuing; that
//! outcome is what the client receives.

#![doc(html_root_url = "https://docs.rs/meridian/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use meridian_config as config;
pub use meridian_core as core;
pub use meridian_extract as extract;
pub use meridian_i18n as i18n;
pub use meridian_middleware as middleware;
pub use meridian_server as server;
pub use meridian_tasks as tasks;
pub use meridian_telemetry as telemetry;
pub use meridian_ws as ws;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use meridian::prelude::*;
/// ```
pub mod prelude {
    pub use meridian_core::outcome::{Html, Json, Redirect, Text};
    pub use meridian_core::{
        ErrorDescription, ErrorOutcome, Format, IntoOutcome, Outcome, Request, RequestId,
        Response,
    };

    pub use meridian_extract::{Binder, Binders, FromParam, Params, Upload, Values};

    pub use meridian_i18n::MessageCatalog;

    pub use meridian_middleware::{
        Action, BoxFuture, Controller, Filter, FilterChain, FnFilter, Next, Stage,
    };

    pub use meridian_server::{
        Lifecycle, RouteTable, Router, Server, ServerConfig, ServerError, ShutdownSignal,
    };

    pub use meridian_config::{ConfigLoader, MeridianConfig};
    pub use meridian_telemetry::init_logging;

    pub use meridian_ws::{Message, WebSocket};

    pub use meridian_tasks::{Job, JobStatus, WorkPermits};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use bytes::Bytes;
    use http_body_util::BodyExt;

    fn hello(c: &mut Controller, name: String) -> Text {
        c.render_text("hello %s", &[&name])
    }

    #[tokio::test]
    async fn test_prelude_is_enough_for_an_app() {
        let mut routes = RouteTable::new();
        routes
            .add("GET", "/hello", Action::new("App.hello", &["name"], hello).unwrap())
            .unwrap();
        let server = Server::builder()
            .with_config(&MeridianConfig::default())
            .router(routes)
            .build()
            .unwrap();

        let req = http::Request::get("/hello?name=world")
            .body(Bytes::new())
            .unwrap();
        let response = server.dispatch(req).await;
        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello world");
    }
}
