//! Fan-in of concurrent asynchronous operations.
//!
//! A [`JoinCoordinator`] tracks the handles of operations still in flight
//! and runs a completion callback exactly once, synchronously, when the
//! last one is finished. It never blocks; callers report completions from
//! whatever callback or task observed them.

use std::fmt;

use super::TaskId;
use crate::error::SyncError;

type Callback = Box<dyn FnOnce() + Send>;

/// Tracks a batch of task handles and fires a callback when all are done.
///
/// Handles are compared with `PartialEq`. The same handle may appear more
/// than once in the initial collection; it then has to be finished once
/// per occurrence.
pub struct JoinCoordinator<T = TaskId> {
    tasks: Vec<T>,
    callback: Option<Callback>,
}

impl<T: fmt::Debug> fmt::Debug for JoinCoordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinCoordinator")
            .field("tasks", &self.tasks)
            .field("fired", &self.callback.is_none())
            .finish()
    }
}

impl<T: PartialEq + fmt::Debug> JoinCoordinator<T> {
    /// Starts tracking `tasks`.
    ///
    /// If `tasks` is empty the callback runs before this returns.
    pub fn new<I, F>(tasks: I, callback: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: FnOnce() + Send + 'static,
    {
        let mut join = Self {
            tasks: tasks.into_iter().collect(),
            callback: Some(Box::new(callback)),
        };
        tracing::debug!(pending = join.tasks.len(), "join started");
        join.fire_if_done();
        join
    }

    /// Marks `task` as finished.
    ///
    /// Runs the callback, inside this call, if `task` was the last one
    /// tracked.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidTask`] if `task` is not tracked, e.g. it
    /// was already finished or never part of the batch.
    pub fn finish(&mut self, task: &T) -> Result<(), SyncError> {
        let Some(position) = self.tasks.iter().position(|t| t == task) else {
            return Err(SyncError::InvalidTask(format!("{task:?}")));
        };
        self.tasks.swap_remove(position);
        self.fire_if_done();
        Ok(())
    }

    /// Returns `true` once no task is left.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks still tracked.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Tasks still tracked, in no particular order.
    #[must_use]
    pub fn tasks(&self) -> &[T] {
        &self.tasks
    }

    fn fire_if_done(&mut self) {
        if !self.is_done() {
            return;
        }
        if let Some(callback) = self.callback.take() {
            tracing::debug!("join complete");
            callback();
        }
    }
}
