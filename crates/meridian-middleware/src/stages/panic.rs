//! Fault recovery around the action.
//!
//! Any panic raised further down the chain is caught here and turned into an
//! error outcome for this request only. Payloads that can be classified
//! (contract violations, string messages, [`ErrorDescription`]s and boxed
//! errors) become an [`ErrorOutcome`] rendered in the negotiated format. In
//! dev mode that outcome carries the captured stack.
//!
//! An unclassifiable payload in dev mode is reported by writing the raw
//! stack to the response with status 500. Outside dev mode the client only
//! ever sees a generic internal error.
//!
//! Stacks are captured where the panic is raised, by a process-wide panic
//! hook installed on first use. The hook chains to the previously installed
//! one.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use futures_util::FutureExt;
use meridian_core::outcome::ErrorOutcome;
use meridian_core::ErrorDescription;

use crate::controller::Controller;
use crate::filter::{BoxFuture, Filter, Next, Stage};

/// Converts downstream panics into error outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicFilter {
    dev_mode: bool,
}

impl PanicFilter {
    /// Creates the filter. `dev_mode` controls whether stacks reach the client.
    #[must_use]
    pub const fn new(dev_mode: bool) -> Self {
        Self { dev_mode }
    }
}

impl Filter for PanicFilter {
    fn name(&self) -> &'static str {
        "panic"
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Panic)
    }

    fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            install_panic_hook();
            if let Err(payload) = AssertUnwindSafe(next.run(c)).catch_unwind().await {
                recover(c, payload.as_ref(), self.dev_mode);
            }
        })
    }
}

thread_local! {
    static LAST_PANIC_STACK: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Installs the panic hook that records the stack of each panic for
/// [`recover`]. Calls after the first do nothing.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let stack = Backtrace::force_capture();
            let _ = LAST_PANIC_STACK.try_with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(stack);
                }
            });
            previous(info);
        }));
    });
}

/// Takes the stack recorded for the latest panic on this thread.
///
/// Returns `None` if the hook is not installed or the payload was raised
/// with [`std::panic::resume_unwind`], which bypasses the hook.
pub fn take_panic_stack() -> Option<Backtrace> {
    LAST_PANIC_STACK
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
        .ok()
        .flatten()
}

/// Records a recovered fault on the controller.
///
/// Used by the panic filter and by the server's outermost guard. The stack
/// is the one recorded where the panic was raised; without one the current
/// stack is used.
pub fn recover(c: &mut Controller, payload: &(dyn Any + Send), dev_mode: bool) {
    let stack = take_panic_stack()
        .unwrap_or_else(Backtrace::force_capture)
        .to_string();
    let request_id = c.request_id();
    let action = c.action_name().unwrap_or("-").to_string();

    match ErrorDescription::from_panic(payload) {
        Some(error) => {
            let error = error.with_stack(stack).with_path(c.request().path());
            tracing::error!(
                request_id = %request_id,
                action = %action,
                error.kind = error.kind(),
                error.message = error.message(),
                stack = error.stack().unwrap_or_default(),
                "recovered from panic"
            );
            c.set_outcome(ErrorOutcome::new(error).expose_stack(dev_mode));
        }
        None => {
            tracing::error!(
                request_id = %request_id,
                action = %action,
                stack = %stack,
                "recovered from unclassified panic"
            );
            if dev_mode {
                c.take_outcome();
                let response = c.response_mut();
                response.set_status(500);
                response.write_header(500, "text/plain; charset=utf-8");
                response.write(stack.as_bytes());
            } else {
                c.set_outcome(ErrorOutcome::new(ErrorDescription::internal()));
            }
        }
    }
}
