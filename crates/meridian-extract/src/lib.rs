//! # Meridian Extract
//!
//! Parameter handling for the Meridian framework.
//!
//! Every request gets a [`Params`] value holding four string sources (fixed,
//! route, query, form), the uploaded files, and a merged view over the string
//! sources. Actions read typed values out of it through the [`Binders`]
//! registry.
//!
//! | Item | Role |
//! |------|------|
//! | [`parse_params`] | fills query, form and files from the request |
//! | [`Params::bind`] | coerces a named parameter into a typed destination |
//! | [`Binder`] / [`Binders`] | type-directed conversion, keyed by [`TypeTag`] |
//! | [`Upload`] | one uploaded file part, in memory or spilled to disk |
//! | [`Cookies`] | `Cookie` header parsing |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use meridian_core::Request;
//! use meridian_extract::{parse_params, Binders, Params};
//!
//! # tokio_test::block_on(async {
//! let request = Request::from_http(
//!     http::Request::builder()
//!         .method("POST")
//!         .uri("/search?page=2")
//!         .header("Content-Type", "application/x-www-form-urlencoded")
//!         .body(Bytes::from_static(b"term=rust"))
//!         .unwrap(),
//! );
//!
//! let mut params = Params::new(Arc::new(Binders::default()));
//! parse_params(&mut params, &request).await;
//!
//! let mut page = 0_u32;
//! params.bind(&mut page, "page");
//! assert_eq!(page, 2);
//! assert_eq!(params.get("term"), Some("rust"));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binder;
mod cookie;
mod error;
pub mod form;
pub mod multipart;
mod params;
mod parse;
mod upload;

pub use binder::{
    Binder, Binders, BoundValue, FromParam, OptionBinder, SeqBinder, TypeTag, ValueBinder,
    MAX_SLICE_INDEX,
};
pub use cookie::Cookies;
pub use error::{ExtractionError, ExtractionSource};
pub use multipart::{parse_multipart, MultipartForm, DEFAULT_MAX_MEMORY};
pub use params::{Params, Values};
pub use parse::{parse_params, parse_params_with_memory};
pub use upload::{Storage, Upload};
