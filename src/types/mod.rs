//! Task identity and lifecycle types shared by every engine component.

pub mod task;

pub use task::{ExecutionId, TaskDefinition, TaskStatus};
