//! Single: one unit, passed straight through.

use std::future::Future;
use std::sync::Arc;

use crate::combinator::join_unit;
use crate::engine::Shared;
use crate::log::{LogSource, Tone};
use crate::types::TaskDefinition;
use crate::unit::{TaskExecutionUnit, UnitResult};

/// Starts one unit. On success the definition is appended to the completed
/// collection; on failure only the unit's own record and log entry change.
pub(crate) fn single(
    shared: &Arc<Shared>,
    definition: TaskDefinition,
) -> impl Future<Output = UnitResult> + Send + 'static {
    let handle = TaskExecutionUnit::prepare(shared, definition.clone()).spawn();
    shared.log.push(
        LogSource::Single,
        Tone::Info,
        format!("Promise for {definition} created and pending resolution."),
    );

    let shared = shared.clone();
    async move {
        let result = join_unit(handle, definition.name.clone()).await;
        if result.is_ok() {
            shared.completed.lock().push(definition);
        }
        result
    }
}
