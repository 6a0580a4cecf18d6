//! Timing sources: the activity indicator and the registry refresh ticker.
//!
//! [`ActivityIndicator`] is the single process-wide "a task is animating"
//! flag plus its elapsed reading. It animates while any unit is running.
//! The reading belongs to the most recently started unit that is still
//! running; when that unit settles, the next newest running unit takes over.
//!
//! [`ElapsedClock`] refreshes `elapsed_secs` on every pending registry
//! record. It runs only while at least one record is pending: the first
//! submission starts it and it stops itself on the first tick that finds
//! nothing pending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::registry::TaskRegistry;
use crate::types::ExecutionId;

/// Default tick resolution for elapsed-time observation.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct IndicatorState {
    /// Running units in start order; the last one owns the reading.
    active: Vec<ExecutionId>,
    elapsed_secs: f64,
}

impl IndicatorState {
    fn owner(&self) -> Option<ExecutionId> {
        self.active.last().copied()
    }
}

/// The global progress indicator.
///
/// # Examples
///
/// ```
/// use promise_sim::clock::ActivityIndicator;
/// use promise_sim::ExecutionId;
///
/// let indicator = ActivityIndicator::new();
/// let older = ExecutionId::next();
/// let newer = ExecutionId::next();
///
/// indicator.begin(older);
/// indicator.begin(newer);
/// assert!(!indicator.finish(newer)); // older is still running
/// assert!(indicator.is_animating());
/// assert!(indicator.finish(older));
/// assert!(!indicator.is_animating());
/// ```
#[derive(Debug, Default)]
pub struct ActivityIndicator {
    state: Mutex<IndicatorState>,
}

impl ActivityIndicator {
    /// Creates an idle indicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `owner` as running, hands it the reading and resets elapsed
    /// to zero.
    pub fn begin(&self, owner: ExecutionId) {
        let mut state = self.state.lock();
        state.active.retain(|id| *id != owner);
        state.active.push(owner);
        state.elapsed_secs = 0.0;
    }

    /// Sets the elapsed reading if `owner` is the newest running unit.
    pub fn advance(&self, owner: ExecutionId, elapsed_secs: f64) {
        let mut state = self.state.lock();
        if state.owner() == Some(owner) {
            state.elapsed_secs = elapsed_secs;
        }
    }

    /// Marks `owner` as settled. Returns `true` if it was running and no
    /// other unit is, so the indicator is now idle; the last elapsed
    /// reading stays visible.
    pub fn finish(&self, owner: ExecutionId) -> bool {
        let mut state = self.state.lock();
        let before = state.active.len();
        state.active.retain(|id| *id != owner);
        state.active.len() < before && state.active.is_empty()
    }

    /// Whether any unit is currently running.
    pub fn is_animating(&self) -> bool {
        !self.state.lock().active.is_empty()
    }

    /// Number of units currently running.
    pub fn running(&self) -> usize {
        self.state.lock().active.len()
    }

    /// The current elapsed reading in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.state.lock().elapsed_secs
    }
}

/// Periodic refresh of pending registry records.
#[derive(Debug, Clone)]
pub struct ElapsedClock {
    registry: Arc<TaskRegistry>,
    tick: Duration,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl ElapsedClock {
    /// Creates a stopped clock over `registry`.
    pub fn new(registry: Arc<TaskRegistry>, tick: Duration) -> Self {
        Self {
            registry,
            tick,
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    /// The refresh resolution.
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Whether a refresh loop is currently alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts the refresh loop on `tracker` unless one is already running.
    pub fn ensure_running(&self, tracker: &TaskTracker) {
        if self.cancel.is_cancelled() || self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(tick_ms = self.tick.as_millis() as u64, "Elapsed clock started");
        tracker.spawn(refresh_loop(
            self.registry.clone(),
            self.tick,
            self.running.clone(),
            self.cancel.clone(),
        ));
    }

    /// Stops the refresh loop for good. Later `ensure_running` calls are no-ops.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

async fn refresh_loop(
    registry: Arc<TaskRegistry>,
    tick: Duration,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                running.store(false, Ordering::Release);
                break;
            }
            _ = interval.tick() => {}
        }

        if registry.recompute_elapsed(Instant::now()) > 0 {
            continue;
        }

        running.store(false, Ordering::Release);
        // A submission may have landed between the refresh and the store.
        // Reclaim the loop only if nobody else has started a new one.
        if registry.pending_count() > 0 && !running.swap(true, Ordering::AcqRel) {
            continue;
        }
        tracing::debug!("Elapsed clock stopped");
        break;
    }
}
