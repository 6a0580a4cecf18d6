//! Combinators composing task execution units.
//!
//! - `single`: one unit, recorded into the completed collection on success
//! - `chain`: units awaited and logged in submission order
//! - `all`: every unit must resolve; the first failure wins
//! - `race`: the first unit to settle wins, success or failure
//!
//! Each combinator is a plain function that does its submission-time work
//! synchronously (records, draws, start message) and returns a `'static`
//! future for the rest. Units are spawned on the engine's tracker, so a
//! combinator that settles early never cancels the units it stops watching.

mod all;
mod chain;
mod race;
mod single;

pub(crate) use all::all;
pub(crate) use chain::chain;
pub(crate) use race::race;
pub(crate) use single::single;

use tokio::task::JoinHandle;

use crate::error::TaskFailure;
use crate::unit::UnitResult;

/// Awaits a spawned unit, mapping a lost task to [`TaskFailure::interrupted`].
pub(crate) async fn join_unit(handle: JoinHandle<UnitResult>, task: String) -> UnitResult {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(task = %task, error = %e, "Unit task did not complete");
            Err(TaskFailure::interrupted(task, e))
        }
    }
}
