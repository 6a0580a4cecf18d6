//! All: parallel join with fail-fast aggregation.

use std::future::Future;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::combinator::join_unit;
use crate::engine::Shared;
use crate::error::TaskFailure;
use crate::log::{LogSource, Tone};
use crate::types::TaskDefinition;
use crate::unit::TaskExecutionUnit;

/// Starts every unit at once.
///
/// Resolves with all messages (in submission order) when the last unit
/// resolves, or with the first failure as soon as it happens. Units still
/// running after a failure finish in the background.
pub(crate) fn all(
    shared: &Arc<Shared>,
    definitions: Vec<TaskDefinition>,
) -> impl Future<Output = Result<Vec<String>, TaskFailure>> + Send + 'static {
    shared
        .log
        .push(LogSource::All, Tone::Info, "Starting all tasks in parallel...");

    let units: Vec<_> = definitions
        .into_iter()
        .map(|definition| {
            let task = definition.name.clone();
            join_unit(TaskExecutionUnit::prepare(shared, definition).spawn(), task)
        })
        .collect();

    let shared = shared.clone();
    async move {
        match try_join_all(units).await {
            Ok(messages) => {
                shared.log.push(
                    LogSource::All,
                    Tone::Resolved,
                    "All tasks resolved successfully!",
                );
                Ok(messages)
            }
            Err(failure) => {
                shared.log.push(
                    LogSource::All,
                    Tone::Rejected,
                    format!("One or more tasks failed: {failure}"),
                );
                Err(failure)
            }
        }
    }
}
