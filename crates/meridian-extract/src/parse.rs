//! Filling [`Params`] from a request.

use meridian_core::Request;

use crate::form::{parse_query, parse_urlencoded};
use crate::multipart::{parse_multipart, DEFAULT_MAX_MEMORY};
use crate::params::{Params, Values};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Fills the query, form and file sources of `params` from `request`.
///
/// The query source always comes from the URL. The body is parsed only for
/// urlencoded and multipart content types; other bodies are left untouched.
/// Parse failures are logged and leave the affected source empty.
/// Multipart uploads are kept in memory up to [`DEFAULT_MAX_MEMORY`].
pub async fn parse_params(params: &mut Params, request: &Request) {
    parse_params_with_memory(params, request, DEFAULT_MAX_MEMORY).await;
}

/// Like [`parse_params`], with uploads beyond `max_memory` bytes written to
/// temporary files.
pub async fn parse_params_with_memory(params: &mut Params, request: &Request, max_memory: usize) {
    let query = match request.query() {
        Some(raw) => parse_query(raw).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to parse query string");
            Values::new()
        }),
        None => Values::new(),
    };
    params.set_query(query);

    match request.content_type() {
        FORM_URLENCODED => match parse_urlencoded(request.body()) {
            Ok(form) => params.set_form(form),
            Err(err) => tracing::warn!(error = %err, "failed to parse form body"),
        },
        MULTIPART_FORM_DATA => {
            match parse_multipart(request.headers(), request.body().clone(), max_memory).await {
                Ok(form) => {
                    params.set_files(form.files, form.spilled);
                    params.set_form(form.values);
                }
                Err(err) => tracing::warn!(error = %err, "failed to parse multipart body"),
            }
        }
        _ => {}
    }
}
