//! A counting limit on concurrently running job bodies.

use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::error::{TaskError, TaskResult};

/// Caps how many job bodies run at the same time.
///
/// Share one `WorkPermits` (behind an `Arc`) between every job that should
/// count against the same limit. A run blocks until a permit is free.
pub struct WorkPermits {
    limit: usize,
    in_use: Mutex<usize>,
    released: Condvar,
}

impl WorkPermits {
    /// Creates a pool of `limit` permits.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidConfig`] if `limit` is zero.
    pub fn new(limit: usize) -> TaskResult<Self> {
        if limit == 0 {
            return Err(TaskError::invalid_config("work permit limit must be at least 1"));
        }
        Ok(Self {
            limit,
            in_use: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    /// Returns the permit limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns how many permits are held right now.
    pub fn in_use(&self) -> usize {
        *self.in_use.lock()
    }

    /// Blocks until a permit is free and takes it.
    pub fn acquire(&self) -> WorkPermit<'_> {
        let mut in_use = self.in_use.lock();
        while *in_use >= self.limit {
            self.released.wait(&mut in_use);
        }
        *in_use += 1;
        WorkPermit { permits: self }
    }

    /// Takes a permit if one is free.
    pub fn try_acquire(&self) -> Option<WorkPermit<'_>> {
        let mut in_use = self.in_use.lock();
        if *in_use >= self.limit {
            return None;
        }
        *in_use += 1;
        Some(WorkPermit { permits: self })
    }

    fn release(&self) {
        let mut in_use = self.in_use.lock();
        *in_use = in_use.saturating_sub(1);
        self.released.notify_one();
    }
}

impl fmt::Debug for WorkPermits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkPermits")
            .field("limit", &self.limit)
            .field("in_use", &self.in_use())
            .finish()
    }
}

/// A held permit, returned on drop.
#[derive(Debug)]
pub struct WorkPermit<'a> {
    permits: &'a WorkPermits,
}

impl Drop for WorkPermit<'_> {
    fn drop(&mut self) {
        self.permits.release();
    }
}
