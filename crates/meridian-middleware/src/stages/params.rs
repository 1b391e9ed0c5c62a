//! Parameter parsing and upload teardown.

use std::panic::{self, AssertUnwindSafe};

use futures_util::FutureExt;
use meridian_extract::{parse_params_with_memory, DEFAULT_MAX_MEMORY};

use crate::controller::Controller;
use crate::filter::{BoxFuture, Filter, Next, Stage};

/// Fills the query and form sources, then removes temporary upload files
/// once the rest of the chain has finished.
///
/// Teardown runs even when a later filter panics; the panic is then resumed
/// so an outer guard still sees it.
#[derive(Debug, Clone, Copy)]
pub struct ParamsFilter {
    max_memory: usize,
}

impl ParamsFilter {
    /// Creates the filter with the default upload memory budget.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_memory(DEFAULT_MAX_MEMORY)
    }

    /// Creates the filter; uploads beyond `max_memory` bytes per request are
    /// written to temporary files.
    #[must_use]
    pub const fn with_max_memory(max_memory: usize) -> Self {
        Self { max_memory }
    }

    /// Returns the upload memory budget.
    #[must_use]
    pub const fn max_memory(&self) -> usize {
        self.max_memory
    }
}

impl Default for ParamsFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for ParamsFilter {
    fn name(&self) -> &'static str {
        "params"
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Params)
    }

    fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            {
                let (request, params) = c.request_and_params();
                parse_params_with_memory(params, request, self.max_memory).await;
            }

            let result = AssertUnwindSafe(next.run(c)).catch_unwind().await;

            let pending = c.params().pending_cleanup();
            if pending > 0 {
                tracing::debug!(files = pending, "removing temporary upload files");
            }
            c.params_mut().cleanup();

            if let Err(payload) = result {
                panic::resume_unwind(payload);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::controller_from;
    use crate::filter::FnFilter;
    use bytes::Bytes;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn post(uri: &str, content_type: &str, body: &'static str) -> Controller {
        controller_from(
            http::Request::post(uri)
                .header("Content-Type", content_type)
                .body(Bytes::from_static(body.as_bytes()))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_query_and_form_are_unified() {
        let mut c = post(
            "/items?page=2",
            "application/x-www-form-urlencoded",
            "name=widget&page=9",
        );
        ParamsFilter::new().call(&mut c, Next::new(&[])).await;

        assert_eq!(c.params().get("name"), Some("widget"));
        assert_eq!(c.params().get_all("page"), ["2", "9"]);
    }

    #[tokio::test]
    async fn test_spilled_upload_removed_after_chain() {
        let body = "--zz\r\n\
            Content-Disposition: form-data; name=\"doc\"; filename=\"big.bin\"\r\n\
            \r\n\
            0123456789abcdef0123456789abcdef\r\n\
            --zz--\r\n";
        let seen: Arc<std::sync::Mutex<Option<PathBuf>>> = Arc::default();
        let record = Arc::clone(&seen);
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(FnFilter::new("record", move |c, _next| {
            let record = Arc::clone(&record);
            Box::pin(async move {
                let path = c.params().files()["doc"][0].path().map(PathBuf::from);
                *record.lock().unwrap() = path;
            })
        }))];

        let mut c = post("/", "multipart/form-data; boundary=zz", body);
        ParamsFilter::with_max_memory(8)
            .call(&mut c, Next::new(&filters))
            .await;

        let path = seen.lock().unwrap().clone().expect("upload spilled to disk");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_malformed_body_leaves_form_empty() {
        let mut c = post("/?a=1", "multipart/form-data", "not multipart at all");
        ParamsFilter::new().call(&mut c, Next::new(&[])).await;

        assert!(c.params().form().is_empty());
        assert_eq!(c.params().get("a"), Some("1"));
    }

    #[tokio::test]
    async fn test_cleanup_runs_when_downstream_panics() {
        let dir = tempfile::tempdir().unwrap();
        let tracked = dir.path().join("upload.bin");
        std::fs::write(&tracked, b"data").unwrap();

        let path: Arc<PathBuf> = Arc::new(tracked.clone());
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(FnFilter::new("explode", move |c, _next| {
            let path = Arc::clone(&path);
            Box::pin(async move {
                c.params_mut().track_temp_file(path.to_path_buf());
                panic!("boom");
            })
        }))];

        let mut c = post("/", "text/plain", "");
        let result = AssertUnwindSafe(ParamsFilter::new().call(&mut c, Next::new(&filters)))
            .catch_unwind()
            .await;

        assert!(result.is_err());
        assert!(!tracked.exists());
        assert_eq!(c.params().pending_cleanup(), 0);
    }
}
