//! The [`Filter`] trait and its explicit continuation.
//!
//! A filter receives the request's [`Controller`] and a [`Next`] holding the
//! filters that have not run yet. Calling [`Next::run`] continues the chain;
//! returning without calling it stops the chain at this filter, and whatever
//! outcome the controller holds at that point is what gets rendered.
//!
//! # Example
//!
//! ```ignore
//! use meridian_middleware::{BoxFuture, Controller, Filter, Next};
//!
//! struct Maintenance;
//!
//! impl Filter for Maintenance {
//!     fn name(&self) -> &'static str {
//!         "maintenance"
//!     }
//!
//!     fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
//!         Box::pin(async move {
//!             if c.request().path().starts_with("/admin") {
//!                 let text = c.render_text("down for maintenance", &[]).with_status(503);
//!                 c.set_outcome(text);
//!                 return;
//!             }
//!             next.run(c).await;
//!         })
//!     }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::controller::Controller;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core stages whose relative order a chain must preserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Locale resolution.
    I18n = 1,
    /// Parameter parsing and upload teardown.
    Params = 2,
    /// Fault recovery around the action.
    Panic = 3,
    /// Action invocation.
    Invoker = 4,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I18n => "i18n",
            Self::Params => "params",
            Self::Panic => "panic",
            Self::Invoker => "invoker",
        }
    }

    /// Returns all stages in their required order.
    #[must_use]
    pub const fn all() -> [Stage; 4] {
        [Self::I18n, Self::Params, Self::Panic, Self::Invoker]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of the request-processing chain.
///
/// Filters are shared by every request and hold no per-request state; all
/// of that lives in the [`Controller`].
pub trait Filter: Send + Sync + 'static {
    /// Returns the filter name used in logs and chain listings.
    fn name(&self) -> &'static str;

    /// Returns the core stage this filter implements, if any.
    ///
    /// Chain construction checks that core stages keep their relative order.
    fn stage(&self) -> Option<Stage> {
        None
    }

    /// Processes the request, calling `next.run(c)` to continue.
    fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()>;
}

/// The filters that have not run yet.
///
/// `Next` is a view into the shared chain; consuming it with
/// [`run`](Self::run) invokes the head with the tail as its continuation.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    filters: &'a [Arc<dyn Filter>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(filters: &'a [Arc<dyn Filter>]) -> Self {
        Self { filters }
    }

    /// Invokes the next filter. Does nothing at the end of the chain.
    pub fn run<'b>(self, c: &'b mut Controller) -> BoxFuture<'b, ()>
    where
        'a: 'b,
    {
        match self.filters.split_first() {
            Some((head, tail)) => head.call(c, Next { filters: tail }),
            None => Box::pin(async {}),
        }
    }

    /// Returns the number of filters left to run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if this is the end of the chain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}

/// A filter built from a function.
///
/// The function receives the controller and the continuation and returns a
/// boxed future, the same shape as [`Filter::call`].
///
/// # Example
///
/// ```ignore
/// let timing = FnFilter::new("timing", |c, next| {
///     Box::pin(async move {
///         let start = std::time::Instant::now();
///         next.run(c).await;
///         tracing::debug!(elapsed = ?start.elapsed(), "request finished");
///     })
/// });
/// ```
pub struct FnFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnFilter<F> {
    /// Creates a new function-based filter.
    pub fn new(name: &'static str, func: F) -> Self
    where
        F: for<'a> Fn(&'a mut Controller, Next<'a>) -> BoxFuture<'a, ()>,
    {
        Self { name, func }
    }
}

impl<F> Filter for FnFilter<F>
where
    F: for<'a> Fn(&'a mut Controller, Next<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
        (self.func)(c, next)
    }
}

impl<F> fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFilter").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::controller;
    use std::sync::Mutex;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        proceed: bool,
    }

    impl Filter for Record {
        fn name(&self) -> &'static str {
            self.name
        }

        fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name);
                if self.proceed {
                    next.run(c).await;
                }
            })
        }
    }

    fn record(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        proceed: bool,
    ) -> Arc<dyn Filter> {
        Arc::new(Record {
            name,
            log: Arc::clone(log),
            proceed,
        })
    }

    #[tokio::test]
    async fn test_next_runs_filters_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let filters = vec![record("a", &log, true), record("b", &log, true), record("c", &log, true)];

        let mut c = controller("/");
        Next::new(&filters).run(&mut c).await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_omitting_next_stops_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let filters = vec![record("a", &log, true), record("b", &log, false), record("c", &log, true)];

        let mut c = controller("/");
        Next::new(&filters).run(&mut c).await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_next_is_noop() {
        let mut c = controller("/");
        let next = Next::new(&[]);
        assert!(next.is_empty());
        next.run(&mut c).await;
        assert!(!c.has_outcome());
    }

    #[tokio::test]
    async fn test_fn_filter() {
        let filter: Arc<dyn Filter> = Arc::new(FnFilter::new("stamp", |c, next| {
            Box::pin(async move {
                c.render_args_mut().insert("stamped".into(), true.into());
                next.run(c).await;
            })
        }));
        assert_eq!(filter.name(), "stamp");
        assert_eq!(filter.stage(), None);

        let filters = vec![filter];
        let mut c = controller("/");
        Next::new(&filters).run(&mut c).await;
        assert_eq!(c.render_args()["stamped"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_stage_order() {
        let stages = Stage::all();
        assert!(stages.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Stage::Panic.to_string(), "panic");
    }
}
