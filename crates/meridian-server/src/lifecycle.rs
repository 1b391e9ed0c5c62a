//! Application startup and shutdown hooks.
//!
//! Startup hooks run in registration order before the listener is bound;
//! the first failure aborts the start. Shutdown hooks run in reverse order
//! once connections have drained; every hook runs and failures are
//! collected.
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian_server::Lifecycle;
//!
//! let lifecycle = Lifecycle::new()
//!     .on_startup_named("warm-cache", || async {
//!         cache::warm().await.map_err(|e| LifecycleError::with_source("cache", e))
//!     })
//!     .on_shutdown(|| async {
//!         tracing::info!("bye");
//!         Ok(())
//!     });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use meridian_middleware::BoxFuture;
use thiserror::Error;

/// Lifecycle hook failures.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A startup hook failed; the server did not start.
    #[error("startup hook `{hook}` failed: {message}")]
    StartupFailed {
        /// Hook name.
        hook: String,
        /// Failure message.
        message: String,
    },

    /// One or more shutdown hooks failed.
    #[error("shutdown hooks failed: {0}")]
    ShutdownFailed(String),

    /// Error returned from inside a hook.
    #[error("{message}")]
    HookError {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl LifecycleError {
    /// Creates a hook error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::HookError {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a hook error wrapping `source`.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::HookError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for lifecycle hooks.
pub type LifecycleResult<T = ()> = Result<T, LifecycleError>;

/// A registered hook.
pub type LifecycleHook = Arc<dyn Fn() -> BoxFuture<'static, LifecycleResult> + Send + Sync>;

/// Ordered startup and shutdown hooks.
#[must_use]
#[derive(Default)]
pub struct Lifecycle {
    startup_hooks: Vec<(String, LifecycleHook)>,
    shutdown_hooks: Vec<(String, LifecycleHook)>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("startup_hooks", &self.startup_hooks.len())
            .field("shutdown_hooks", &self.shutdown_hooks.len())
            .finish()
    }
}

impl Lifecycle {
    /// Creates an empty lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a startup hook named `startup_<n>`.
    pub fn on_startup<F, Fut>(self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        let name = format!("startup_{}", self.startup_hooks.len());
        self.on_startup_named(name, hook)
    }

    /// Registers a named startup hook.
    pub fn on_startup_named<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.startup_hooks.push((name.into(), erase(hook)));
        self
    }

    /// Registers a shutdown hook named `shutdown_<n>`.
    pub fn on_shutdown<F, Fut>(self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        let name = format!("shutdown_{}", self.shutdown_hooks.len());
        self.on_shutdown_named(name, hook)
    }

    /// Registers a named shutdown hook.
    pub fn on_shutdown_named<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.shutdown_hooks.push((name.into(), erase(hook)));
        self
    }

    /// Returns the number of startup hooks.
    pub fn startup_hook_count(&self) -> usize {
        self.startup_hooks.len()
    }

    /// Returns the number of shutdown hooks.
    pub fn shutdown_hook_count(&self) -> usize {
        self.shutdown_hooks.len()
    }

    /// Runs startup hooks in order, stopping at the first failure.
    pub async fn run_startup(&self) -> LifecycleResult {
        for (name, hook) in &self.startup_hooks {
            tracing::debug!(hook = %name, "running startup hook");
            if let Err(e) = hook().await {
                tracing::error!(hook = %name, error = %e, "startup hook failed");
                return Err(LifecycleError::StartupFailed {
                    hook: name.clone(),
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Runs every shutdown hook in reverse order.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ShutdownFailed`] listing every failed hook.
    pub async fn run_shutdown(&self) -> LifecycleResult {
        let mut errors = Vec::new();
        for (name, hook) in self.shutdown_hooks.iter().rev() {
            tracing::debug!(hook = %name, "running shutdown hook");
            if let Err(e) = hook().await {
                tracing::error!(hook = %name, error = %e, "shutdown hook failed");
                errors.push(format!("{name}: {e}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::ShutdownFailed(errors.join("; ")))
        }
    }

    /// Appends `other`'s hooks after this lifecycle's.
    pub fn merge(mut self, other: Lifecycle) -> Self {
        self.startup_hooks.extend(other.startup_hooks);
        self.shutdown_hooks.extend(other.shutdown_hooks);
        self
    }
}

fn erase<F, Fut>(hook: F) -> LifecycleHook
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LifecycleResult> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, LifecycleResult> { Box::pin(hook()) })
}
