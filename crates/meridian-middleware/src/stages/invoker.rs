//! Action invocation.

use crate::controller::Controller;
use crate::filter::{BoxFuture, Filter, Next, Stage};

/// Calls the routed action and stores its outcome.
///
/// Only a returned outcome replaces the current one, so an outcome set by an
/// earlier filter survives an action that returns nothing. Requests with no
/// routed action pass straight through.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionInvoker;

impl ActionInvoker {
    /// Creates the filter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Filter for ActionInvoker {
    fn name(&self) -> &'static str {
        "invoker"
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Invoker)
    }

    fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Some(action) = c.action().cloned() {
                tracing::debug!(request_id = %c.request_id(), action = action.name(), "invoking action");
                if let Some(outcome) = action.invoke(c) {
                    c.set_boxed_outcome(outcome);
                }
            }
            next.run(c).await;
        })
    }
}
