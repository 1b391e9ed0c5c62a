//! The assembled filter chain.
//!
//! A [`FilterChain`] is built once at startup and shared read-only by every
//! request. The builder checks that the core stages keep their relative
//! order:
//!
//! ```text
//! I18n → Params → Panic → Invoker
//! ```
//!
//! Filters without a stage may go anywhere. Placing a core stage out of order
//! is rejected unless the builder was told to
//! [`allow_reordering`](FilterChainBuilder::allow_reordering).
//!
//! # Example
//!
//! ```
//! use meridian_middleware::{FilterChain, Stage};
//!
//! let chain = FilterChain::standard("MERIDIAN_LANG", false);
//! assert_eq!(chain.names(), vec!["i18n", "params", "panic", "invoker"]);
//! assert_eq!(chain.stage_index(Stage::Panic), Some(2));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::controller::Controller;
use crate::error::ChainError;
use crate::filter::{Filter, Next, Stage};
use crate::stages::{ActionInvoker, I18nFilter, PanicFilter, ParamsFilter};

/// An immutable, ordered list of filters.
#[derive(Clone)]
pub struct FilterChain {
    filters: Arc<[Arc<dyn Filter>]>,
}

impl FilterChain {
    /// Creates a new chain builder.
    #[must_use]
    pub fn builder() -> FilterChainBuilder {
        FilterChainBuilder::new()
    }

    /// The core chain: locale resolution, parameter parsing, fault recovery
    /// and action invocation.
    #[must_use]
    pub fn standard(cookie_name: impl Into<String>, dev_mode: bool) -> Self {
        Self {
            filters: standard_filters(cookie_name.into(), dev_mode).into(),
        }
    }

    /// Runs the chain from its head.
    pub async fn run(&self, c: &mut Controller) {
        Next::new(&self.filters).run(c).await;
    }

    /// Returns the filter names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Returns the position of the filter implementing `stage`.
    #[must_use]
    pub fn stage_index(&self, stage: Stage) -> Option<usize> {
        self.filters.iter().position(|f| f.stage() == Some(stage))
    }

    /// Returns the number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .finish()
    }
}

fn standard_filters(cookie_name: String, dev_mode: bool) -> Vec<Arc<dyn Filter>> {
    vec![
        Arc::new(I18nFilter::new(cookie_name)),
        Arc::new(ParamsFilter::new()),
        Arc::new(PanicFilter::new(dev_mode)),
        Arc::new(ActionInvoker::new()),
    ]
}

enum Placement {
    Before(Stage),
    After(Stage),
    Replace(Stage),
}

/// Builder for a [`FilterChain`].
///
/// Filters are appended in call order. [`before`](Self::before) and
/// [`after`](Self::after) position a filter relative to a core stage,
/// resolved when the chain is built.
pub struct FilterChainBuilder {
    filters: Vec<Arc<dyn Filter>>,
    placed: Vec<(Placement, Arc<dyn Filter>)>,
    allow_reordering: bool,
}

impl FilterChainBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            placed: Vec::new(),
            allow_reordering: false,
        }
    }

    /// Creates a builder holding the [standard](FilterChain::standard) filters.
    #[must_use]
    pub fn standard(cookie_name: impl Into<String>, dev_mode: bool) -> Self {
        Self {
            filters: standard_filters(cookie_name.into(), dev_mode),
            ..Self::new()
        }
    }

    /// Appends a filter.
    #[must_use]
    pub fn filter<F: Filter>(self, filter: F) -> Self {
        self.filter_arc(Arc::new(filter))
    }

    /// Appends a shared filter.
    #[must_use]
    pub fn filter_arc(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Inserts a filter at the head of the chain.
    #[must_use]
    pub fn prepend<F: Filter>(self, filter: F) -> Self {
        self.prepend_arc(Arc::new(filter))
    }

    /// Inserts a shared filter at the head of the chain.
    #[must_use]
    pub fn prepend_arc(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.insert(0, filter);
        self
    }

    /// Inserts a filter immediately before the filter for `stage`.
    #[must_use]
    pub fn before<F: Filter>(self, stage: Stage, filter: F) -> Self {
        self.before_arc(stage, Arc::new(filter))
    }

    /// Inserts a shared filter immediately before the filter for `stage`.
    #[must_use]
    pub fn before_arc(mut self, stage: Stage, filter: Arc<dyn Filter>) -> Self {
        self.placed.push((Placement::Before(stage), filter));
        self
    }

    /// Inserts a filter immediately after the filter for `stage`.
    #[must_use]
    pub fn after<F: Filter>(self, stage: Stage, filter: F) -> Self {
        self.after_arc(stage, Arc::new(filter))
    }

    /// Inserts a shared filter immediately after the filter for `stage`.
    #[must_use]
    pub fn after_arc(mut self, stage: Stage, filter: Arc<dyn Filter>) -> Self {
        self.placed.push((Placement::After(stage), filter));
        self
    }

    /// Swaps the filter for `stage` with `filter`, which should serve the
    /// same stage.
    #[must_use]
    pub fn replace<F: Filter>(self, stage: Stage, filter: F) -> Self {
        self.replace_arc(stage, Arc::new(filter))
    }

    /// Swaps the filter for `stage` with a shared filter.
    #[must_use]
    pub fn replace_arc(mut self, stage: Stage, filter: Arc<dyn Filter>) -> Self {
        self.placed.push((Placement::Replace(stage), filter));
        self
    }

    /// Skips the core stage order check.
    #[must_use]
    pub fn allow_reordering(mut self) -> Self {
        self.allow_reordering = true;
        self
    }

    /// Builds the chain.
    ///
    /// # Errors
    ///
    /// - [`ChainError::MissingStage`] if `before`/`after` names a stage the
    ///   chain lacks
    /// - [`ChainError::DuplicateStage`] or [`ChainError::OutOfOrder`] if the
    ///   core stages are not in order and reordering was not allowed
    pub fn build(self) -> Result<FilterChain, ChainError> {
        let mut filters = self.filters;

        for (placement, filter) in self.placed {
            let stage = match placement {
                Placement::Before(stage) | Placement::After(stage) | Placement::Replace(stage) => {
                    stage
                }
            };
            let index = filters
                .iter()
                .position(|f| f.stage() == Some(stage))
                .ok_or(ChainError::MissingStage(stage))?;
            match placement {
                Placement::Before(_) => filters.insert(index, filter),
                Placement::After(_) => filters.insert(index + 1, filter),
                Placement::Replace(_) => filters[index] = filter,
            }
        }

        if !self.allow_reordering {
            check_order(&filters)?;
        }

        tracing::debug!(
            filters = ?filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            "filter chain assembled"
        );

        Ok(FilterChain {
            filters: filters.into(),
        })
    }
}

impl Default for FilterChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_order(filters: &[Arc<dyn Filter>]) -> Result<(), ChainError> {
    let mut last: Option<Stage> = None;
    for filter in filters {
        let Some(stage) = filter.stage() else {
            continue;
        };
        match last {
            Some(prev) if prev == stage => return Err(ChainError::DuplicateStage(stage)),
            Some(prev) if prev > stage => {
                return Err(ChainError::OutOfOrder {
                    filter: filter.name(),
                    stage,
                    after: prev,
                })
            }
            _ => last = Some(stage),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::controller;
    use crate::filter::{BoxFuture, FnFilter};
    use meridian_core::outcome::Text;

    struct Named(&'static str);

    impl Filter for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
            next.run(c)
        }
    }

    #[test]
    fn test_standard_order() {
        let chain = FilterChain::standard("APP_LANG", false);
        assert_eq!(chain.len(), 4);
        for (index, stage) in Stage::all().into_iter().enumerate() {
            assert_eq!(chain.stage_index(stage), Some(index));
        }
    }

    #[test]
    fn test_before_and_after_placement() {
        let chain = FilterChainBuilder::standard("APP_LANG", false)
            .prepend(Named("router"))
            .before(Stage::Invoker, Named("auth"))
            .after(Stage::Invoker, Named("audit"))
            .filter(Named("tail"))
            .build()
            .unwrap();

        assert_eq!(
            chain.names(),
            vec!["router", "i18n", "params", "panic", "auth", "invoker", "audit", "tail"]
        );
    }

    #[test]
    fn test_replace_keeps_position() {
        struct SmallParams;

        impl Filter for SmallParams {
            fn name(&self) -> &'static str {
                "small-params"
            }

            fn stage(&self) -> Option<Stage> {
                Some(Stage::Params)
            }

            fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
                next.run(c)
            }
        }

        let chain = FilterChainBuilder::standard("APP_LANG", false)
            .replace(Stage::Params, SmallParams)
            .build()
            .unwrap();
        assert_eq!(chain.names(), vec!["i18n", "small-params", "panic", "invoker"]);

        let err = FilterChain::builder()
            .replace(Stage::Params, SmallParams)
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::MissingStage(Stage::Params));
    }

    #[test]
    fn test_out_of_order_rejected() {
        let err = FilterChain::builder()
            .filter(ParamsFilter::new())
            .filter(I18nFilter::new("APP_LANG"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::OutOfOrder {
                filter: "i18n",
                stage: Stage::I18n,
                after: Stage::Params,
            }
        );
    }

    #[test]
    fn test_reordering_opt_out() {
        let chain = FilterChain::builder()
            .filter(ParamsFilter::new())
            .filter(I18nFilter::new("APP_LANG"))
            .allow_reordering()
            .build()
            .unwrap();
        assert_eq!(chain.names(), vec!["params", "i18n"]);
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = FilterChain::builder()
            .filter(PanicFilter::new(false))
            .filter(PanicFilter::new(true))
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::DuplicateStage(Stage::Panic));
    }

    #[test]
    fn test_missing_stage_rejected() {
        let err = FilterChain::builder()
            .before(Stage::Invoker, Named("auth"))
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::MissingStage(Stage::Invoker));
    }

    #[tokio::test]
    async fn test_short_circuit_outcome_is_final() {
        let chain = FilterChainBuilder::standard("APP_LANG", false)
            .prepend(FnFilter::new("cache", |c, _next| {
                Box::pin(async move {
                    c.set_outcome(Text::new("cached"));
                })
            }))
            .build()
            .unwrap();

        let mut c = controller("/?q=1");
        chain.run(&mut c).await;

        assert!(c.has_outcome());
        // Params never ran, so the query source is still empty.
        assert!(c.params().query().is_empty());
        assert_eq!(c.request().locale(), "");
        assert!(!c.render_args().contains_key("currentLocale"));
    }
}
