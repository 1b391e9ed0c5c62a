//! # Meridian Middleware
//!
//! The filter chain every Meridian request runs through.
//!
//! A [`Controller`] carries the per-request state. Each [`Filter`] receives
//! it together with a [`Next`] continuation holding the filters that have
//! not run yet. A filter continues the chain by calling `next.run(c)` and
//! stops it by returning without doing so.
//!
//! ## Core Stages
//!
//! ```text
//! Request → I18n → Params → Panic → Invoker → (outcome)
//! ```
//!
//! | Stage | Filter            | Purpose                                          |
//! |-------|-------------------|--------------------------------------------------|
//! | 1     | [`I18nFilter`]    | Resolve the request locale                       |
//! | 2     | [`ParamsFilter`]  | Parse parameters; remove temp files afterwards   |
//! | 3     | [`PanicFilter`]   | Convert faults into error outcomes               |
//! | 4     | [`ActionInvoker`] | Bind arguments and call the routed [`Action`]    |
//!
//! Other filters can be placed anywhere around these with
//! [`FilterChainBuilder`], as long as the core stages keep this order.
//!
//! ## Example
//!
//! ```
//! use meridian_middleware::{FilterChain, Stage};
//!
//! let chain = FilterChain::standard("MERIDIAN_LANG", false);
//! assert_eq!(chain.len(), Stage::all().len());
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod chain;
mod controller;
mod error;
mod filter;
pub mod stages;

pub use action::{Action, ActionArg, ActionArgs, ArgKind, ArgSpec, Handler};
pub use chain::{FilterChain, FilterChainBuilder};
pub use controller::{Controller, RenderArgs};
pub use error::{ActionError, ChainError};
pub use filter::{BoxFuture, Filter, FnFilter, Next, Stage};
pub use stages::{ActionInvoker, I18nFilter, PanicFilter, ParamsFilter};
