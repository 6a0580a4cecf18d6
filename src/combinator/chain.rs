//! Chain: results awaited and logged strictly in submission order.
//!
//! In [`ChainMode::Eager`] every unit is started when the chain is built and
//! the chain only orders the awaiting, so the whole chain takes as long as
//! its slowest unit. In [`ChainMode::Sequential`] only the first unit starts
//! with the chain; each later unit starts after its predecessor resolved.
//!
//! On the first failure in sequence order the chain logs that failure and
//! stops. Units that were already started keep running in the background;
//! their settlement is no longer logged by the chain.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::combinator::join_unit;
use crate::config::ChainMode;
use crate::engine::Shared;
use crate::error::TaskFailure;
use crate::log::{LogSource, Tone};
use crate::types::TaskDefinition;
use crate::unit::{TaskExecutionUnit, UnitResult};

enum Step {
    Started {
        task: String,
        handle: JoinHandle<UnitResult>,
    },
    Deferred(TaskDefinition),
}

/// Runs `definitions` as a chain. Resolves with every step's message, or
/// with the first failure in sequence order.
pub(crate) fn chain(
    shared: &Arc<Shared>,
    definitions: Vec<TaskDefinition>,
    mode: ChainMode,
) -> impl Future<Output = Result<Vec<String>, TaskFailure>> + Send + 'static {
    shared
        .log
        .push(LogSource::Chain, Tone::Info, "Starting chained tasks...");
    tracing::debug!(steps = definitions.len(), mode = %mode, "Chain built");

    let mut remaining: VecDeque<TaskDefinition> = definitions.iter().cloned().collect();
    let steps: Vec<Step> = definitions
        .into_iter()
        .enumerate()
        .map(|(index, definition)| match mode {
            ChainMode::Sequential if index > 0 => Step::Deferred(definition),
            _ => Step::Started {
                task: definition.name.clone(),
                handle: TaskExecutionUnit::prepare(shared, definition).spawn(),
            },
        })
        .collect();

    let shared = shared.clone();
    async move {
        let mut messages = Vec::with_capacity(steps.len());
        for step in steps {
            let (task, handle) = match step {
                Step::Started { task, handle } => (task, handle),
                Step::Deferred(definition) => {
                    let task = definition.name.clone();
                    (task, TaskExecutionUnit::prepare(&shared, definition).spawn())
                }
            };

            match join_unit(handle, task).await {
                Ok(message) => {
                    shared
                        .log
                        .push(LogSource::Chain, Tone::Resolved, message.as_str());
                    if let Some(head) = remaining.pop_front() {
                        shared.completed.lock().push(head);
                    }
                    messages.push(message);
                }
                Err(failure) => {
                    shared
                        .log
                        .push(LogSource::Chain, Tone::Rejected, failure.message.as_str());
                    return Err(failure);
                }
            }
        }
        Ok(messages)
    }
}
