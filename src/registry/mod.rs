//! The task registry: every execution record the engine knows about.
//!
//! Records are keyed by their unique [`ExecutionId`] and iterate in
//! submission order. The registry only grows; settled records stay visible
//! for the lifetime of the process.
//!
//! # Concurrency
//!
//! Units settle from independently spawned tasks, so the map sits behind a
//! `parking_lot::Mutex`. Every operation takes the lock for a short,
//! non-async critical section; no guard is held across an `.await`.

pub mod record;

pub use record::{TaskExecutionRecord, STEP_CREATED, STEP_REJECTED, STEP_RESOLVED};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{Result, SimError};
use crate::types::{ExecutionId, TaskStatus};

/// Insertion-ordered collection of [`TaskExecutionRecord`]s.
///
/// # Examples
///
/// ```
/// use promise_sim::registry::{TaskExecutionRecord, TaskRegistry};
/// use promise_sim::{ExecutionId, TaskDefinition, TaskStatus};
///
/// let registry = TaskRegistry::new();
/// let id = registry.add(TaskExecutionRecord::new(
///     ExecutionId::next(),
///     TaskDefinition::new(2, "Booking a Flight"),
/// ));
///
/// let record = registry
///     .update_status(id, TaskStatus::Completed, "Promise resolved")
///     .unwrap();
/// assert_eq!(record.status, TaskStatus::Completed);
///
/// // A second terminal transition is rejected.
/// assert!(registry
///     .update_status(id, TaskStatus::Failed, "Promise rejected")
///     .is_err());
/// ```
#[derive(Debug, Default)]
pub struct TaskRegistry {
    records: Mutex<IndexMap<ExecutionId, TaskExecutionRecord>>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its handle.
    ///
    /// Re-adding an existing handle replaces the record in place without
    /// changing its position.
    pub fn add(&self, record: TaskExecutionRecord) -> ExecutionId {
        let id = record.execution;
        tracing::debug!(execution = %id, task = %record.task, "Record added");
        self.records.lock().insert(id, record);
        id
    }

    /// Moves a record to `status` with a new step description.
    ///
    /// Terminal transitions freeze `elapsed_secs` at the current instant.
    /// Returns a copy of the updated record.
    ///
    /// # Errors
    ///
    /// - [`SimError::UnknownExecution`] if no record has this handle.
    /// - [`SimError::InvalidTransition`] if the record already settled or the
    ///   target equals the current status.
    pub fn update_status(
        &self,
        id: ExecutionId,
        status: TaskStatus,
        step: impl Into<String>,
    ) -> Result<TaskExecutionRecord> {
        let now = Instant::now();
        let mut records = self.records.lock();
        let record = records.get_mut(&id).ok_or(SimError::UnknownExecution(id))?;
        record.status.validate_transition(id, &status)?;

        record.refresh_elapsed(now);
        record.status = status;
        record.step = step.into();

        tracing::debug!(
            execution = %id,
            status = %status,
            elapsed_secs = record.elapsed_secs,
            "Record updated"
        );
        Ok(record.clone())
    }

    /// Snapshot of every record, in submission order.
    pub fn list_in_order(&self) -> Vec<TaskExecutionRecord> {
        self.records.lock().values().cloned().collect()
    }

    /// Refreshes `elapsed_secs` on every pending record.
    ///
    /// Pure presentation refresh; it never affects settlement. Returns the
    /// number of records that are still pending.
    pub fn recompute_elapsed(&self, now: Instant) -> usize {
        let mut records = self.records.lock();
        let mut pending = 0;
        for record in records.values_mut().filter(|r| r.is_pending()) {
            record.refresh_elapsed(now);
            pending += 1;
        }
        pending
    }

    /// Looks up one record.
    pub fn get(&self, id: ExecutionId) -> Option<TaskExecutionRecord> {
        self.records.lock().get(&id).cloned()
    }

    /// Every record submitted from the definition with catalog id `task_id`.
    pub fn executions_of(&self, task_id: u32) -> Vec<TaskExecutionRecord> {
        self.records
            .lock()
            .values()
            .filter(|r| r.task.id == task_id)
            .cloned()
            .collect()
    }

    /// Number of records still pending.
    pub fn pending_count(&self) -> usize {
        self.records.lock().values().filter(|r| r.is_pending()).count()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing has been submitted yet.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
