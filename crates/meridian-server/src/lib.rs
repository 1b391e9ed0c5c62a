//! # Meridian Server
//!
//! The HTTP server for the Meridian framework.
//!
//! This crate turns connections into [`Controller`](meridian_middleware::Controller)s
//! and runs them through the filter chain:
//!
//! - HTTP/1.1 via Hyper, with WebSocket upgrades
//! - Pattern routing to registered actions
//! - An outermost panic guard around the whole chain
//! - Connection limits and graceful shutdown
//! - Startup and shutdown hooks
//!
//! ## Example
//!
//! ```rust,ignore
//! use meridian_middleware::{Action, Controller};
//! use meridian_core::outcome::Text;
//! use meridian_server::{RouteTable, Server};
//!
//! fn show(c: &mut Controller, id: u64) -> Text {
//!     c.render_text("item %d", &[&id])
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut routes = RouteTable::new();
//!     routes.add("GET", "/items/{id}", Action::new("Items.show", &["id"], show)?)?;
//!
//!     Server::builder().router(routes).build()?.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod lifecycle;
mod router;
mod server;
mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_BYTES, DEFAULT_SHUTDOWN_TIMEOUT_SECS};
pub use error::ServerError;
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleHook, LifecycleResult};
pub use router::{RouteMatch, RouteTable, Router, RouterFilter};
pub use server::{HttpResponse, Server, ServerBuilder, DEFAULT_COOKIE_NAME};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
