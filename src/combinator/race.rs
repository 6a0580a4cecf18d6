//! Race: the first unit to settle decides, success or failure.

use std::future::Future;
use std::sync::Arc;

use futures::future::select_all;

use crate::engine::Shared;
use crate::error::TaskFailure;
use crate::log::{LogSource, Tone};
use crate::types::TaskDefinition;
use crate::unit::{TaskExecutionUnit, UnitResult};

/// Starts every unit at once and settles with whichever settles first.
///
/// An empty race settles immediately with [`TaskFailure::no_contenders`].
pub(crate) fn race(
    shared: &Arc<Shared>,
    definitions: Vec<TaskDefinition>,
) -> impl Future<Output = UnitResult> + Send + 'static {
    shared
        .log
        .push(LogSource::Race, Tone::Info, "Starting race between tasks...");

    let (tasks, handles): (Vec<String>, Vec<_>) = definitions
        .into_iter()
        .map(|definition| {
            let task = definition.name.clone();
            (task, TaskExecutionUnit::prepare(shared, definition).spawn())
        })
        .unzip();

    let shared = shared.clone();
    async move {
        let result = if handles.is_empty() {
            Err(TaskFailure::no_contenders())
        } else {
            // Dropping the losing handles detaches them; those units keep running.
            let (joined, index, _rest) = select_all(handles).await;
            joined.unwrap_or_else(|e| Err(TaskFailure::interrupted(tasks[index].as_str(), e)))
        };

        match &result {
            Ok(message) => shared.log.push(
                LogSource::Race,
                Tone::Resolved,
                format!("First task resolved: {message}"),
            ),
            Err(failure) => shared.log.push(
                LogSource::Race,
                Tone::Rejected,
                format!("First task failed: {failure}"),
            ),
        };
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::engine::Simulator;
    use crate::outcome::{OutcomeDraw, ScriptedOutcomes};
    use crate::types::TaskStatus;
    use crate::Catalog;

    #[tokio::test(start_paused = true)]
    async fn fastest_failure_wins() {
        let sim = Simulator::builder()
            .with_outcomes(ScriptedOutcomes::new([
                OutcomeDraw::success_after(2.0),
                OutcomeDraw::success_after(1.9),
                OutcomeDraw::success_after(2.2),
                OutcomeDraw::failure_after(1.3),
                OutcomeDraw::success_after(1.6),
            ]))
            .build();
        let start = Instant::now();

        let failure = sim.run_race(Catalog::examples().all()).await.unwrap_err();

        assert_eq!(Instant::now() - start, Duration::from_millis(1300));
        assert_eq!(failure.task, "Sending an Email");
        assert_eq!(
            sim.log().latest_message().as_deref(),
            Some("First task failed: Promise for Sending an Email was rejected after 1.3 seconds.")
        );

        sim.wait_idle().await;
        let completed = sim
            .registry()
            .list_in_order()
            .iter()
            .filter(|r| r.status == TaskStatus::Completed)
            .count();
        assert_eq!(completed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn fastest_success_wins() {
        let sim = Simulator::builder()
            .with_outcomes(ScriptedOutcomes::new([
                OutcomeDraw::failure_after(2.0),
                OutcomeDraw::success_after(1.1),
            ]))
            .build();
        let defs = Catalog::examples().all()[..2].to_vec();

        let message = sim.run_race(defs).await.unwrap();
        assert_eq!(message, "Promise for Booking a Flight resolved after 1.1 seconds.");
        assert_eq!(
            sim.log().latest_message().as_deref(),
            Some("First task resolved: Promise for Booking a Flight resolved after 1.1 seconds.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_race_has_no_contenders() {
        let sim = Simulator::new();
        let failure = sim.run_race(Vec::new()).await.unwrap_err();
        assert_eq!(failure, crate::TaskFailure::no_contenders());
    }
}
