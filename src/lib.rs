//! # promise-sim
//!
//! A simulator for asynchronous task execution and the standard combinators
//! over it: single, chain, all and race.
//!
//! Each submitted task is a [`TaskExecutionUnit`](unit::TaskExecutionUnit)
//! that waits a randomly drawn duration and then resolves or is rejected
//! with a fixed probability. Its lifecycle is tracked in the
//! [`TaskRegistry`](registry::TaskRegistry), milestones are appended to the
//! [`LogStream`](log::LogStream), and a process-wide activity indicator
//! reports the elapsed time of the most recently started unit.
//!
//! ## Quick start
//!
//! ```
//! use promise_sim::{SimConfig, Simulator};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), promise_sim::SimError> {
//! let config = SimConfig {
//!     seed: Some(7),
//!     min_duration_ms: 10,
//!     max_duration_ms: 20,
//!     ..SimConfig::default()
//! };
//! let sim = Simulator::from_config(&config)?;
//!
//! sim.submit_all();
//! sim.wait_idle().await;
//!
//! let snapshot = sim.snapshot();
//! assert_eq!(snapshot.records.len(), 5);
//! assert!(!snapshot.animating);
//! # Ok(())
//! # }
//! ```
//!
//! ## Combinator semantics
//!
//! | Combinator | Starts units | Settles with |
//! |---|---|---|
//! | single | one | the unit's result |
//! | chain (eager) | all at once | every result in order, or the first failure in order |
//! | chain (sequential) | one after another | same, later units never start after a failure |
//! | all | all at once | every result, or the first failure in time |
//! | race | all at once | the first settlement in time |
//!
//! No combinator ever cancels a unit: units a combinator stops watching run
//! to completion and still update the registry.

pub mod catalog;
pub mod clock;
mod combinator;
pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod outcome;
pub mod registry;
pub mod types;
pub mod unit;

pub use catalog::Catalog;
pub use config::{ChainMode, SimConfig};
pub use engine::{SimSnapshot, Simulator, SimulatorBuilder};
pub use error::{ConfigError, Result, SimError, TaskFailure};
pub use log::{LogEntry, LogSource, LogStream, Tone};
pub use outcome::{OutcomeDraw, OutcomeSource, RandomOutcomes, ScriptedOutcomes};
pub use registry::{TaskExecutionRecord, TaskRegistry};
pub use types::{ExecutionId, TaskDefinition, TaskStatus};
pub use unit::UnitResult;
