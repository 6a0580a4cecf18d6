//! Task execution record -- the registry's per-submission state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::types::{ExecutionId, TaskDefinition, TaskStatus};

/// Step text of a freshly submitted record.
pub const STEP_CREATED: &str = "Task Created";

/// Step text after a unit resolves.
pub const STEP_RESOLVED: &str = "Promise resolved";

/// Step text after a unit is rejected.
pub const STEP_REJECTED: &str = "Promise rejected";

/// Mutable state of one submitted execution.
///
/// `elapsed_secs` is derived from `started_at`: the registry refreshes it on
/// every clock tick while the record is `Pending` and freezes it at the
/// terminal transition, so observers see a monotonic value that then stays
/// put.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExecutionRecord {
    /// Unique handle of this submission.
    pub execution: ExecutionId,
    /// The catalog definition this submission was made from.
    pub task: TaskDefinition,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Description of the most recent milestone.
    pub step: String,
    /// Wall-clock creation time, for display.
    pub created_at: DateTime<Utc>,
    /// Monotonic start instant used to derive `elapsed_secs`.
    #[serde(skip)]
    pub started_at: Instant,
    /// Seconds since `started_at`, as of the last refresh.
    pub elapsed_secs: f64,
}

impl TaskExecutionRecord {
    /// Creates a `Pending` record with step [`STEP_CREATED`], started now.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_sim::registry::TaskExecutionRecord;
    /// use promise_sim::{ExecutionId, TaskDefinition, TaskStatus};
    ///
    /// let record = TaskExecutionRecord::new(
    ///     ExecutionId::next(),
    ///     TaskDefinition::new(1, "Ordering a Pizza"),
    /// );
    /// assert_eq!(record.status, TaskStatus::Pending);
    /// assert_eq!(record.step, "Task Created");
    /// assert_eq!(record.elapsed_secs, 0.0);
    /// ```
    pub fn new(execution: ExecutionId, task: TaskDefinition) -> Self {
        Self {
            execution,
            task,
            status: TaskStatus::Pending,
            step: STEP_CREATED.to_string(),
            created_at: Utc::now(),
            started_at: Instant::now(),
            elapsed_secs: 0.0,
        }
    }

    /// Returns `true` while the record has not settled.
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Recomputes `elapsed_secs` from `now`. Settled records are left alone.
    pub fn refresh_elapsed(&mut self, now: Instant) {
        if self.is_pending() {
            self.elapsed_secs = now.saturating_duration_since(self.started_at).as_secs_f64();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pizza() -> TaskExecutionRecord {
        TaskExecutionRecord::new(ExecutionId::next(), TaskDefinition::new(1, "Ordering a Pizza"))
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_tracks_pending_records() {
        let mut record = pizza();
        tokio::time::advance(Duration::from_millis(1500)).await;
        record.refresh_elapsed(Instant::now());
        assert!((record.elapsed_secs - 1.5).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_ignores_settled_records() {
        let mut record = pizza();
        record.status = TaskStatus::Completed;
        record.elapsed_secs = 1.2;
        tokio::time::advance(Duration::from_secs(5)).await;
        record.refresh_elapsed(Instant::now());
        assert_eq!(record.elapsed_secs, 1.2);
    }

    #[tokio::test]
    async fn serializes_camel_case_without_instant() {
        let record = pizza();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["step"], "Task Created");
        assert_eq!(json["task"]["name"], "Ordering a Pizza");
        assert!(json.get("elapsedSecs").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("startedAt").is_none());
    }
}
