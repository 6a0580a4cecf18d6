//! Core task types: the immutable [`TaskDefinition`], the one-way
//! [`TaskStatus`] state machine, and the per-submission [`ExecutionId`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SimError;

/// An immutable description of a kind of simulated work.
///
/// Definitions come from a fixed catalog and are reused cyclically, so the
/// same `id` can appear in many concurrent submissions. Use [`ExecutionId`]
/// to tell those submissions apart.
///
/// # Examples
///
/// ```
/// use promise_sim::TaskDefinition;
///
/// let pizza = TaskDefinition::new(1, "Ordering a Pizza");
/// assert_eq!(pizza.id, 1);
/// assert_eq!(pizza.to_string(), "Ordering a Pizza");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Catalog identity. Not unique across submissions.
    pub id: u32,
    /// Human-readable task name used in every log message.
    pub name: String,
}

impl TaskDefinition {
    /// Creates a definition from an id and a name.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lifecycle status of a task execution record.
///
/// # State Machine
///
/// ```text
/// Pending -> Completed, Failed
/// Completed -> (terminal, no transitions)
/// Failed -> (terminal, no transitions)
/// ```
///
/// Exactly one terminal transition happens per execution. There is no
/// cancelled state: once started, a unit always runs to completion.
///
/// # Examples
///
/// ```
/// use promise_sim::TaskStatus;
///
/// assert!(!TaskStatus::Pending.is_terminal());
/// assert!(TaskStatus::Pending.can_transition_to(&TaskStatus::Failed));
/// assert!(!TaskStatus::Completed.can_transition_to(&TaskStatus::Failed));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// The unit is still waiting out its drawn duration.
    Pending,
    /// The unit resolved successfully (terminal).
    Completed,
    /// The unit was rejected (terminal).
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl TaskStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [TaskStatus; 3] = [Self::Pending, Self::Completed, Self::Failed];

    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns `true` if moving from this status to `next` is allowed.
    ///
    /// Only `Pending` may move, and only to a terminal status. Self
    /// transitions are rejected.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed) | (Self::Pending, Self::Failed)
        )
    }

    /// Validates a transition, returning [`SimError::InvalidTransition`]
    /// with context when it is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_sim::{ExecutionId, TaskStatus};
    ///
    /// let id = ExecutionId::from_raw(7);
    /// assert!(TaskStatus::Pending
    ///     .validate_transition(id, &TaskStatus::Completed)
    ///     .is_ok());
    /// assert!(TaskStatus::Failed
    ///     .validate_transition(id, &TaskStatus::Pending)
    ///     .is_err());
    /// ```
    pub fn validate_transition(&self, execution: ExecutionId, next: &Self) -> Result<(), SimError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(SimError::InvalidTransition {
                execution,
                from: *self,
                to: *next,
            })
        }
    }
}

/// Unique handle of one submitted execution.
///
/// Handles are allocated from a process-wide monotonic counter, so two
/// submissions of the same [`TaskDefinition`] never share a handle and
/// registry updates can never hit the wrong record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(u64);

static NEXT_EXECUTION_ID: AtomicU64 = AtomicU64::new(1);

impl ExecutionId {
    /// Allocates the next unused handle.
    pub fn next() -> Self {
        Self(NEXT_EXECUTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw value. Intended for tests and deserialized snapshots.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        assert_eq!(TaskStatus::Pending.to_string(), "Pending");
        assert_eq!(TaskStatus::Completed.to_string(), "Completed");
        assert_eq!(TaskStatus::Failed.to_string(), "Failed");
    }

    #[test]
    fn pending_moves_only_to_terminal_states() {
        assert!(TaskStatus::Pending.can_transition_to(&TaskStatus::Completed));
        assert!(TaskStatus::Pending.can_transition_to(&TaskStatus::Failed));
        assert!(!TaskStatus::Pending.can_transition_to(&TaskStatus::Pending));
    }

    #[test]
    fn terminal_states_reject_all_transitions() {
        for terminal in [TaskStatus::Completed, TaskStatus::Failed] {
            for target in TaskStatus::ALL {
                assert!(
                    !terminal.can_transition_to(&target),
                    "{terminal} should not transition to {target}"
                );
            }
        }
    }

    #[test]
    fn validate_transition_reports_context() {
        let id = ExecutionId::from_raw(42);
        let err = TaskStatus::Completed
            .validate_transition(id, &TaskStatus::Failed)
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("exec-42"), "missing execution id: {text}");
        assert!(text.contains("Completed"));
        assert!(text.contains("Failed"));
    }

    #[test]
    fn execution_ids_are_unique_and_increasing() {
        let a = ExecutionId::next();
        let b = ExecutionId::next();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn execution_id_serializes_as_number() {
        let json = serde_json::to_value(ExecutionId::from_raw(9)).unwrap();
        assert_eq!(json, serde_json::json!(9));
    }
}
