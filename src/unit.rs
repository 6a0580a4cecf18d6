//! The task execution unit: one timed, randomly-settling submission.
//!
//! A unit is built in two phases. [`TaskExecutionUnit::prepare`] runs
//! synchronously at submission time: it allocates the execution handle,
//! registers the Pending record, takes the outcome draw and claims the
//! activity indicator. [`TaskExecutionUnit::run`] then waits out the drawn
//! duration, advancing the indicator every tick, and settles exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::engine::Shared;
use crate::error::TaskFailure;
use crate::log::{LogSource, Tone};
use crate::outcome::OutcomeDraw;
use crate::registry::{TaskExecutionRecord, STEP_REJECTED, STEP_RESOLVED};
use crate::types::{ExecutionId, TaskDefinition, TaskStatus};

/// What a unit settles with: its success message or its failure.
pub type UnitResult = Result<String, TaskFailure>;

/// A prepared, not yet awaited, task execution.
pub struct TaskExecutionUnit {
    execution: ExecutionId,
    definition: TaskDefinition,
    draw: OutcomeDraw,
    started_at: Instant,
    shared: Arc<Shared>,
}

impl TaskExecutionUnit {
    pub(crate) fn prepare(shared: &Arc<Shared>, definition: TaskDefinition) -> Self {
        let execution = ExecutionId::next();
        let draw = shared.outcomes.lock().draw();
        let record = TaskExecutionRecord::new(execution, definition.clone());
        let started_at = record.started_at;

        shared.registry.add(record);
        shared.indicator.begin(execution);
        shared.clock.ensure_running(&shared.tracker);

        tracing::info!(
            execution = %execution,
            task = %definition,
            duration_secs = draw.duration_secs(),
            "Unit started"
        );

        Self {
            execution,
            definition,
            draw,
            started_at,
            shared: shared.clone(),
        }
    }

    /// Unique handle of this execution.
    pub fn execution(&self) -> ExecutionId {
        self.execution
    }

    /// The definition this unit runs.
    pub fn definition(&self) -> &TaskDefinition {
        &self.definition
    }

    /// The outcome drawn for this unit.
    pub fn draw(&self) -> OutcomeDraw {
        self.draw
    }

    /// Spawns [`run`](Self::run) on the engine's tracker. The unit keeps
    /// running if the returned handle is dropped.
    pub(crate) fn spawn(self) -> JoinHandle<UnitResult> {
        let tracker = self.shared.tracker.clone();
        tracker.spawn(self.run())
    }

    /// Waits the drawn duration, then settles.
    pub async fn run(self) -> UnitResult {
        let tick = self.shared.tick;
        let deadline = self.started_at + self.draw.duration;
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        let mut ticker = tokio::time::interval_at(self.started_at + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut sleep => break,
                _ = ticker.tick() => {
                    let elapsed = self.elapsed_capped(Instant::now());
                    self.shared.indicator.advance(self.execution, elapsed);
                    tracing::trace!(execution = %self.execution, elapsed, "Tick");
                }
            }
        }

        self.settle()
    }

    fn elapsed_capped(&self, now: Instant) -> f64 {
        let elapsed: Duration = now.saturating_duration_since(self.started_at);
        elapsed.min(self.draw.duration).as_secs_f64()
    }

    fn settle(self) -> UnitResult {
        let secs = self.draw.duration_secs();
        let name = &self.definition.name;
        let source = LogSource::Unit(self.execution);
        self.shared.indicator.advance(self.execution, secs);

        let result = if self.draw.will_fail {
            self.record(TaskStatus::Failed, STEP_REJECTED);
            self.shared.log.push(
                source,
                Tone::Rejected,
                format!("Promise for {name} was rejected after {secs:.1} seconds due to an error."),
            );
            Err(TaskFailure::rejected(name.as_str(), secs))
        } else {
            self.record(TaskStatus::Completed, STEP_RESOLVED);
            self.shared.log.push(
                source,
                Tone::Resolved,
                format!("Promise for {name} resolved successfully after {secs:.1} seconds."),
            );
            Ok(format!("Promise for {name} resolved after {secs:.1} seconds."))
        };

        if self.shared.indicator.finish(self.execution) {
            tracing::debug!(execution = %self.execution, "Indicator released");
        }
        result
    }

    fn record(&self, status: TaskStatus, step: &str) {
        if let Err(e) = self.shared.registry.update_status(self.execution, status, step) {
            tracing::error!(execution = %self.execution, error = %e, "Failed to record settlement");
        }
    }
}

impl std::fmt::Debug for TaskExecutionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutionUnit")
            .field("execution", &self.execution)
            .field("definition", &self.definition)
            .field("draw", &self.draw)
            .finish()
    }
}
