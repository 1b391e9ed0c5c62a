//! # Meridian Core
//!
//! Request-level building blocks for the Meridian framework.
//!
//! This crate provides the types every other Meridian crate is built on:
//!
//! - [`Format`] and the content negotiation functions ([`resolve_content_type`],
//!   [`resolve_format`], [`format_to_content_type`])
//! - [`AcceptLanguages`] - quality-sorted `Accept-Language` parsing
//! - [`Request`] - an inbound request with its negotiated attributes
//! - [`Response`] - a buffered response whose header is written exactly once
//! - [`Outcome`] - the capability a handler returns to render itself
//! - [`ErrorDescription`] and [`ContractViolation`] - structured fault reporting
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/meridian-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod accept_language;
mod context;
mod error;
mod format;
pub mod outcome;
mod request;
mod response;

pub use accept_language::{resolve_accept_language, AcceptLanguage, AcceptLanguages};
pub use context::RequestId;
pub use error::{contract_violation, ContractViolation, ErrorDescription};
pub use format::{
    format_to_content_type, resolve_content_type, resolve_format, Format, UnknownFormat,
};
pub use outcome::{BoxOutcome, ErrorOutcome, IntoOutcome, Outcome};
pub use request::Request;
pub use response::Response;
