//! Error types for the simulation engine.
//!
//! [`TaskFailure`] is the only way a simulated unit can fail. It is a normal,
//! expected outcome carried through the combinators, not a bug. [`SimError`]
//! covers misuse of the engine itself (bad transitions, unknown handles,
//! invalid configuration).

use crate::types::{ExecutionId, TaskStatus};

/// A rejected task execution.
///
/// Every failure is terminal for its unit and is never retried. The message
/// names the task and the elapsed duration, e.g.
/// `"Promise for Booking a Flight was rejected after 2.3 seconds."`.
///
/// # Examples
///
/// ```
/// use promise_sim::TaskFailure;
///
/// let failure = TaskFailure::rejected("Sending an Email", 1.84);
/// assert_eq!(
///     failure.to_string(),
///     "Promise for Sending an Email was rejected after 1.8 seconds."
/// );
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct TaskFailure {
    /// Name of the task that failed.
    pub task: String,
    /// Seconds the unit ran before it settled.
    pub elapsed_secs: f64,
    /// Human-readable failure message.
    pub message: String,
}

impl TaskFailure {
    /// Builds the failure a unit reports when its outcome draw says it fails.
    pub fn rejected(task: impl Into<String>, elapsed_secs: f64) -> Self {
        let task = task.into();
        let message = format!("Promise for {task} was rejected after {elapsed_secs:.1} seconds.");
        Self {
            task,
            elapsed_secs,
            message,
        }
    }

    /// Builds the failure reported when a unit's spawned task never delivered
    /// its outcome (it panicked or the runtime shut it down).
    pub fn interrupted(task: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        let task = task.into();
        let message = format!("Promise for {task} was interrupted: {reason}");
        Self {
            task,
            elapsed_secs: 0.0,
            message,
        }
    }

    /// The outcome of a race started with no units.
    pub fn no_contenders() -> Self {
        Self {
            task: String::new(),
            elapsed_secs: 0.0,
            message: "Race started without any tasks.".to_string(),
        }
    }
}

/// Errors raised by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A registry update tried to leave a terminal state or repeat a state.
    #[error("invalid transition from {from} to {to} for {execution}")]
    InvalidTransition {
        /// The execution being updated.
        execution: ExecutionId,
        /// Its current status.
        from: TaskStatus,
        /// The rejected target status.
        to: TaskStatus,
    },

    /// No record exists for the given execution handle.
    #[error("unknown execution: {0}")]
    UnknownExecution(ExecutionId),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that occur while loading or validating [`SimConfig`](crate::config::SimConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML content is malformed or does not match the expected schema.
    #[error("failed to parse config TOML: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        source: std::io::Error,
        path: String,
    },

    /// The config parsed but holds unusable values.
    #[error("config validation error: {message}")]
    Validation { message: String },
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience alias for engine results.
pub type Result<T, E = SimError> = std::result::Result<T, E>;
