//! # Meridian Tasks
//!
//! A wrapper for background jobs.
//!
//! [`Job`] adds a name, a running/idle [`JobStatus`] and panic containment
//! to any [`Runnable`]. Two guards are available:
//!
//! - [`Job::exclusive`] skips a run while the previous one is still going
//! - [`WorkPermits`] caps how many job bodies run at once across all jobs
//!   sharing it
//!
//! Scheduling is left to the caller.
//!
//! ```
//! use std::sync::Arc;
//! use meridian_tasks::{Job, WorkPermits};
//!
//! let permits = Arc::new(WorkPermits::new(4).unwrap());
//! let job = Job::named("purge-uploads", || {})
//!     .exclusive()
//!     .with_permits(Arc::clone(&permits));
//!
//! std::thread::spawn(move || job.run()).join().unwrap().unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-tasks/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod job;
mod permits;

pub use error::{TaskError, TaskResult};
pub use job::{Job, JobStatus, Runnable, UNNAMED};
pub use permits::{WorkPermit, WorkPermits};
