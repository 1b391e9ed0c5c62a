//! The job wrapper.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::error::{TaskError, TaskResult};
use crate::permits::WorkPermits;

/// Name given to jobs whose type has no meaningful name.
pub const UNNAMED: &str = "(unnamed)";

/// A unit of background work.
///
/// Implemented for every `Fn()` closure; implement it directly to give a
/// job a type whose name shows up in logs.
pub trait Runnable: Send + Sync + 'static {
    /// Does the work.
    fn run(&self);
}

impl<F> Runnable for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn run(&self) {
        self()
    }
}

/// Whether a job body is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// At least one run is in progress.
    Running,
    /// No run is in progress.
    Idle,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("RUNNING"),
            Self::Idle => f.write_str("IDLE"),
        }
    }
}

/// A named [`Runnable`] with status tracking and optional concurrency guards.
///
/// A panic in the body is caught and logged with its backtrace; it never
/// reaches the caller of [`run`](Self::run).
///
/// # Example
///
/// ```
/// use meridian_tasks::{Job, JobStatus};
///
/// let job = Job::new(|| { /* sweep expired sessions */ }).exclusive();
/// assert_eq!(job.name(), "(unnamed)");
/// assert!(job.run().is_ok());
/// assert_eq!(job.status(), JobStatus::Idle);
/// ```
pub struct Job {
    name: String,
    inner: Box<dyn Runnable>,
    running: AtomicUsize,
    exclusive: Option<Mutex<()>>,
    permits: Option<Arc<WorkPermits>>,
}

impl Job {
    /// Wraps `runnable`, naming the job after its type.
    pub fn new<R: Runnable>(runnable: R) -> Self {
        Self::named(type_name_of::<R>(), runnable)
    }

    /// Wraps `runnable` under an explicit name.
    pub fn named<R: Runnable>(name: impl Into<String>, runnable: R) -> Self {
        Self {
            name: name.into(),
            inner: Box::new(runnable),
            running: AtomicUsize::new(0),
            exclusive: None,
            permits: None,
        }
    }

    /// Skips a run while a previous one is still going.
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.exclusive = Some(Mutex::new(()));
        self
    }

    /// Counts this job's runs against `permits`.
    #[must_use]
    pub fn with_permits(mut self, permits: Arc<WorkPermits>) -> Self {
        self.permits = Some(permits);
        self
    }

    /// Returns the job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if overlapping runs are skipped.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive.is_some()
    }

    /// Returns the current status.
    pub fn status(&self) -> JobStatus {
        if self.running.load(Ordering::SeqCst) > 0 {
            JobStatus::Running
        } else {
            JobStatus::Idle
        }
    }

    /// Runs the job body on the calling thread.
    ///
    /// # Errors
    ///
    /// - [`TaskError::AlreadyRunning`] if the job is exclusive and busy
    /// - [`TaskError::Panicked`] if the body panicked
    pub fn run(&self) -> TaskResult {
        let _exclusive = match &self.exclusive {
            Some(lock) => match lock.try_lock() {
                Some(guard) => Some(guard),
                None => {
                    info!(job = %self.name, "job already running, skipping this run");
                    return Err(TaskError::AlreadyRunning(self.name.clone()));
                }
            },
            None => None,
        };

        let _permit = self.permits.as_deref().map(WorkPermits::acquire);

        self.running.fetch_add(1, Ordering::SeqCst);
        let _status = StatusGuard(&self.running);

        debug!(job = %self.name, "job started");
        match catch_unwind(AssertUnwindSafe(|| self.inner.run())) {
            Ok(()) => {
                debug!(job = %self.name, "job finished");
                Ok(())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    job = %self.name,
                    panic = %message,
                    stack = %Backtrace::force_capture(),
                    "job panicked"
                );
                Err(TaskError::panicked(self.name.clone(), message))
            }
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("exclusive", &self.is_exclusive())
            .field("permits", &self.permits)
            .finish()
    }
}

struct StatusGuard<'a>(&'a AtomicUsize);

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn type_name_of<T>() -> String {
    let full = std::any::type_name::<T>();
    if full.contains("{{closure}}") {
        return UNNAMED.to_string();
    }
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    struct Reindex;

    impl Runnable for Reindex {
        fn run(&self) {}
    }

    struct Generic<T>(std::marker::PhantomData<T>);

    impl<T: Send + Sync + 'static> Runnable for Generic<T> {
        fn run(&self) {}
    }

    #[test]
    fn test_names() {
        assert_eq!(Job::new(Reindex).name(), "Reindex");
        assert_eq!(Job::new(Generic::<u8>(std::marker::PhantomData)).name(), "Generic");
        assert_eq!(Job::new(|| {}).name(), UNNAMED);
        assert_eq!(Job::named("nightly", || {}).name(), "nightly");
    }

    #[test]
    fn test_status_while_running() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);

        let job = Arc::new(Job::new(move || {
            started_tx.send(()).unwrap();
            release_rx.lock().recv().unwrap();
        }));
        assert_eq!(job.status(), JobStatus::Idle);

        let runner = {
            let job = Arc::clone(&job);
            thread::spawn(move || job.run())
        };
        started_rx.recv().unwrap();
        assert_eq!(job.status(), JobStatus::Running);
        assert_eq!(job.status().to_string(), "RUNNING");

        release_tx.send(()).unwrap();
        runner.join().unwrap().unwrap();
        assert_eq!(job.status(), JobStatus::Idle);
    }

    #[test]
    fn test_exclusive_skips_overlap() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);

        let job = Arc::new(
            Job::named("export", move || {
                started_tx.send(()).unwrap();
                release_rx.lock().recv().unwrap();
            })
            .exclusive(),
        );

        let first = {
            let job = Arc::clone(&job);
            thread::spawn(move || job.run())
        };
        started_rx.recv().unwrap();

        assert_eq!(job.run(), Err(TaskError::AlreadyRunning("export".into())));

        release_tx.send(()).unwrap();
        first.join().unwrap().unwrap();
    }

    #[test]
    fn test_panic_is_contained() {
        let job = Job::named("flaky", || panic!("disk full"));
        assert_eq!(job.run(), Err(TaskError::panicked("flaky", "disk full")));
        assert_eq!(job.status(), JobStatus::Idle);

        let formatted = Job::named("flaky", || panic!("{} left", 0));
        assert_eq!(formatted.run(), Err(TaskError::panicked("flaky", "0 left")));
    }

    #[test]
    fn test_permits_cap_concurrency() {
        let permits = Arc::new(WorkPermits::new(1).unwrap());
        let overlap = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicUsize::new(0));

        let make = |name: &str| {
            let overlap = Arc::clone(&overlap);
            let active = Arc::clone(&active);
            Arc::new(
                Job::named(name, move || {
                    if active.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlap.store(true, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .with_permits(Arc::clone(&permits)),
            )
        };

        let jobs = [make("a"), make("b"), make("c")];
        let handles: Vec<_> = jobs
            .iter()
            .map(|job| {
                let job = Arc::clone(job);
                thread::spawn(move || job.run())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert!(!overlap.load(Ordering::SeqCst));
        assert_eq!(permits.in_use(), 0);
    }
}
