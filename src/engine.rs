//! Simulation engine: shared state, triggers and the observable snapshot.
//!
//! [`Simulator`] is the top-level entry point that:
//! - Owns the registry, log stream, activity indicator and outcome source
//! - Spawns every unit and combinator via [`tokio_util::task::TaskTracker`]
//! - Exposes four fire-and-forget triggers plus awaitable `run_*` variants
//! - Publishes the latest log entry through a watch channel
//!
//! Triggers must be called from within a tokio runtime.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

use crate::catalog::Catalog;
use crate::clock::{ActivityIndicator, ElapsedClock, DEFAULT_TICK};
use crate::combinator;
use crate::config::{ChainMode, SimConfig};
use crate::error::{Result, TaskFailure};
use crate::log::{LogEntry, LogStream};
use crate::outcome::{OutcomeSource, RandomOutcomes};
use crate::registry::{TaskExecutionRecord, TaskRegistry};
use crate::types::TaskDefinition;
use crate::unit::UnitResult;

/// Compile-time Send bounds verification for types crossing task boundaries.
fn _assert_send_sync<T: Send + Sync>() {}
#[allow(dead_code)]
fn _check_send_bounds() {
    _assert_send_sync::<Shared>();
    _assert_send_sync::<SimSnapshot>();
    _assert_send_sync::<LogEntry>();
}

/// State shared by the engine, every unit and every combinator.
pub(crate) struct Shared {
    pub(crate) registry: Arc<TaskRegistry>,
    pub(crate) log: LogStream,
    pub(crate) indicator: ActivityIndicator,
    pub(crate) clock: ElapsedClock,
    pub(crate) tracker: TaskTracker,
    /// Number of `wait_idle` callers currently holding the tracker closed.
    idle_waiters: Mutex<usize>,
    pub(crate) outcomes: Mutex<Box<dyn OutcomeSource>>,
    pub(crate) completed: Mutex<Vec<TaskDefinition>>,
    pub(crate) tick: Duration,
}

/// Read-only view of the engine for presentation layers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimSnapshot {
    /// Every execution record, in submission order.
    pub records: Vec<TaskExecutionRecord>,
    /// The latest log message.
    pub log: Option<String>,
    /// Whether any unit is currently running.
    pub animating: bool,
    /// The indicator's elapsed reading in seconds.
    pub elapsed_secs: f64,
    /// Definitions recorded as completed by the single and chain combinators.
    pub completed: Vec<TaskDefinition>,
}

/// Builder for [`Simulator`].
pub struct SimulatorBuilder {
    tick: Duration,
    outcomes: Option<Box<dyn OutcomeSource>>,
    catalog: Catalog,
    chain_mode: ChainMode,
}

impl SimulatorBuilder {
    fn new() -> Self {
        Self {
            tick: DEFAULT_TICK,
            outcomes: None,
            catalog: Catalog::examples(),
            chain_mode: ChainMode::default(),
        }
    }

    /// Applies a validated configuration: tick, outcome distribution, seed
    /// and chain mode.
    pub fn with_config(mut self, config: &SimConfig) -> Result<Self> {
        config.validate()?;
        self.tick = config.tick();
        self.outcomes = Some(Box::new(config.outcomes()));
        self.chain_mode = config.chain_mode;
        Ok(self)
    }

    /// Sets the elapsed-time tick. A zero tick is ignored.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        if !tick.is_zero() {
            self.tick = tick;
        }
        self
    }

    /// Replaces the outcome source.
    pub fn with_outcomes(mut self, outcomes: impl OutcomeSource + 'static) -> Self {
        self.outcomes = Some(Box::new(outcomes));
        self
    }

    /// Replaces the catalog used by the triggers.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the chain mode used by [`Simulator::submit_chain`].
    pub fn with_chain_mode(mut self, mode: ChainMode) -> Self {
        self.chain_mode = mode;
        self
    }

    /// Builds the simulator. Without an explicit source, outcomes are drawn
    /// from an entropy-seeded [`RandomOutcomes`].
    pub fn build(self) -> Simulator {
        let registry = Arc::new(TaskRegistry::new());
        let outcomes = self
            .outcomes
            .unwrap_or_else(|| Box::new(RandomOutcomes::from_entropy()));
        let shared = Shared {
            clock: ElapsedClock::new(registry.clone(), self.tick),
            registry,
            log: LogStream::new(),
            indicator: ActivityIndicator::new(),
            tracker: TaskTracker::new(),
            idle_waiters: Mutex::new(0),
            outcomes: Mutex::new(outcomes),
            completed: Mutex::new(Vec::new()),
            tick: self.tick,
        };
        Simulator {
            shared: Arc::new(shared),
            catalog: self.catalog,
            chain_mode: self.chain_mode,
        }
    }
}

/// The task-simulation engine.
///
/// # Examples
///
/// ```
/// use promise_sim::outcome::{OutcomeDraw, ScriptedOutcomes};
/// use promise_sim::Simulator;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let sim = Simulator::builder()
///     .with_outcomes(ScriptedOutcomes::new([OutcomeDraw::success_after(1.5)]))
///     .build();
///
/// sim.submit_one();
/// assert_eq!(sim.snapshot().records.len(), 1);
///
/// sim.wait_idle().await;
/// assert_eq!(sim.completed()[0].name, "Ordering a Pizza");
/// # }
/// ```
pub struct Simulator {
    shared: Arc<Shared>,
    catalog: Catalog,
    chain_mode: ChainMode,
}

impl Simulator {
    /// A simulator with default settings and entropy-seeded outcomes.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a simulator.
    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::new()
    }

    /// A simulator built from `config`.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        Ok(Self::builder().with_config(config)?.build())
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    // ---- Triggers: fire-and-forget ------------------------------------------

    /// Submits the next catalog entry as a single task.
    pub fn submit_one(&self) {
        let future = combinator::single(&self.shared, self.catalog.next_definition());
        self.shared.tracker.spawn(async move {
            let _ = future.await;
        });
    }

    /// Submits the three-task chain from the catalog.
    pub fn submit_chain(&self) {
        let future = combinator::chain(
            &self.shared,
            self.catalog.chain_selection(),
            self.chain_mode,
        );
        self.shared.tracker.spawn(async move {
            let _ = future.await;
        });
    }

    /// Submits every catalog entry to the parallel join.
    pub fn submit_all(&self) {
        let future = combinator::all(&self.shared, self.catalog.all());
        self.shared.tracker.spawn(async move {
            let _ = future.await;
        });
    }

    /// Submits every catalog entry to a race.
    pub fn submit_race(&self) {
        let future = combinator::race(&self.shared, self.catalog.all());
        self.shared.tracker.spawn(async move {
            let _ = future.await;
        });
    }

    // ---- Awaitable combinators ----------------------------------------------

    /// Runs one unit and returns its result.
    pub async fn run_single(&self, definition: TaskDefinition) -> UnitResult {
        combinator::single(&self.shared, definition).await
    }

    /// Runs a chain and returns every step's message or the first failure.
    pub async fn run_chain(
        &self,
        definitions: Vec<TaskDefinition>,
        mode: ChainMode,
    ) -> std::result::Result<Vec<String>, TaskFailure> {
        combinator::chain(&self.shared, definitions, mode).await
    }

    /// Runs a parallel join and returns every message or the first failure.
    pub async fn run_all(
        &self,
        definitions: Vec<TaskDefinition>,
    ) -> std::result::Result<Vec<String>, TaskFailure> {
        combinator::all(&self.shared, definitions).await
    }

    /// Runs a race and returns the first settlement.
    pub async fn run_race(&self, definitions: Vec<TaskDefinition>) -> UnitResult {
        combinator::race(&self.shared, definitions).await
    }

    // ---- Observation --------------------------------------------------------

    /// A consistent-enough copy of the observable state.
    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            records: self.shared.registry.list_in_order(),
            log: self.shared.log.latest_message(),
            animating: self.shared.indicator.is_animating(),
            elapsed_secs: self.shared.indicator.elapsed_secs(),
            completed: self.completed(),
        }
    }

    /// Observes every new log entry.
    pub fn subscribe_log(&self) -> watch::Receiver<Option<LogEntry>> {
        self.shared.log.subscribe()
    }

    /// The task registry.
    pub fn registry(&self) -> &TaskRegistry {
        &self.shared.registry
    }

    /// The log stream.
    pub fn log(&self) -> &LogStream {
        &self.shared.log
    }

    /// Definitions recorded as completed, in completion order.
    pub fn completed(&self) -> Vec<TaskDefinition> {
        self.shared.completed.lock().clone()
    }

    /// Whether any unit is currently running.
    pub fn is_animating(&self) -> bool {
        self.shared.indicator.is_animating()
    }

    /// The catalog used by the triggers.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The chain mode used by [`submit_chain`](Self::submit_chain).
    pub fn chain_mode(&self) -> ChainMode {
        self.chain_mode
    }

    /// The elapsed-time tick.
    pub fn tick(&self) -> Duration {
        self.shared.tick
    }

    // ---- Lifecycle ----------------------------------------------------------

    /// Waits until every spawned unit, combinator and the refresh clock have
    /// finished, including units no combinator is watching anymore.
    /// Submissions remain possible afterwards. Any number of callers may
    /// wait concurrently.
    pub async fn wait_idle(&self) {
        let _waiter = IdleWaiter::enter(&self.shared);
        self.shared.tracker.wait().await;
        tracing::debug!(records = self.shared.registry.len(), "Simulator idle");
    }

    /// Stops the refresh clock, then waits for in-flight units to settle.
    /// Running units are never cancelled.
    pub async fn shutdown(&self) {
        self.shared.clock.stop();
        self.wait_idle().await;
    }
}

/// Keeps the tracker closed while at least one `wait_idle` caller waits.
/// The last waiter to leave reopens it, even if its future was dropped.
struct IdleWaiter<'a> {
    shared: &'a Shared,
}

impl<'a> IdleWaiter<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let mut waiters = shared.idle_waiters.lock();
        *waiters += 1;
        shared.tracker.close();
        Self { shared }
    }
}

impl Drop for IdleWaiter<'_> {
    fn drop(&mut self) {
        let mut waiters = self.shared.idle_waiters.lock();
        *waiters -= 1;
        if *waiters == 0 {
            self.shared.tracker.reopen();
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("records", &self.shared.registry.len())
            .field("catalog", &self.catalog.len())
            .field("chain_mode", &self.chain_mode)
            .field("tick", &self.shared.tick)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{OutcomeDraw, ScriptedOutcomes};
    use crate::types::TaskStatus;
    use pretty_assertions::assert_eq;

    fn scripted(draws: impl IntoIterator<Item = OutcomeDraw>) -> Simulator {
        Simulator::builder()
            .with_outcomes(ScriptedOutcomes::new(draws))
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn triggers_return_before_settlement() {
        let sim = scripted([]);
        sim.submit_one();

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].status, TaskStatus::Pending);
        assert!(snapshot.animating);
        assert_eq!(
            snapshot.log.as_deref(),
            Some("Promise for Ordering a Pizza created and pending resolution.")
        );

        sim.wait_idle().await;
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.records[0].status, TaskStatus::Completed);
        assert!(!snapshot.animating);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_one_cycles_catalog() {
        let sim = scripted([]);
        for _ in 0..6 {
            sim.submit_one();
        }
        sim.wait_idle().await;
        let names: Vec<String> = sim.completed().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "Ordering a Pizza",
                "Booking a Flight",
                "Downloading a File",
                "Sending an Email",
                "Getting a Loan Approval",
                "Ordering a Pizza",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn submit_chain_uses_middle_entries() {
        let sim = scripted([]);
        sim.submit_chain();
        sim.wait_idle().await;
        let names: Vec<String> = sim
            .registry()
            .list_in_order()
            .into_iter()
            .map(|r| r.task.name)
            .collect();
        assert_eq!(
            names,
            vec!["Booking a Flight", "Downloading a File", "Sending an Email"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn submit_all_and_race_use_whole_catalog() {
        let sim = scripted([]);
        sim.submit_all();
        sim.submit_race();
        assert_eq!(sim.registry().len(), 10);
        sim.wait_idle().await;
        assert_eq!(sim.registry().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_allows_further_submissions() {
        let sim = scripted([]);
        sim.submit_one();
        sim.wait_idle().await;
        sim.submit_one();
        sim.wait_idle().await;
        assert_eq!(sim.completed().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn log_subscription_sees_milestones() {
        let sim = scripted([OutcomeDraw::failure_after(1.0)]);
        let mut rx = sim.subscribe_log();
        sim.submit_race();
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|e| e.message.clone()),
            Some("Starting race between tasks...".to_string())
        );

        sim.wait_idle().await;
        assert!(rx.has_changed().unwrap());
        let latest = rx.borrow_and_update().clone().unwrap();
        assert_eq!(latest.seq, sim.log().len() as u64);
    }

    #[test]
    fn from_config_rejects_invalid_values() {
        let config = SimConfig {
            failure_probability: 2.0,
            ..SimConfig::default()
        };
        assert!(Simulator::from_config(&config).is_err());
    }

    #[test]
    fn zero_tick_is_ignored() {
        let sim = Simulator::builder().with_tick(Duration::ZERO).build();
        assert_eq!(sim.tick(), DEFAULT_TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_serializes() {
        let sim = scripted([]);
        sim.submit_one();
        let json = serde_json::to_value(sim.snapshot()).unwrap();
        assert_eq!(json["records"][0]["task"]["name"], "Ordering a Pizza");
        assert_eq!(json["animating"], true);
        sim.wait_idle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_wait_idle_callers_all_return() {
        let sim = Arc::new(scripted([
            OutcomeDraw::success_after(1.0),
            OutcomeDraw::success_after(2.5),
        ]));
        sim.submit_one();
        sim.submit_one();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let sim = sim.clone();
                tokio::spawn(async move { sim.wait_idle().await })
            })
            .collect();
        for waiter in waiters {
            waiter.await.unwrap();
        }

        assert_eq!(sim.registry().pending_count(), 0);
        assert!(!sim.shared.tracker.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_wait_idle_reopens_tracker() {
        let sim = scripted([]);
        sim.submit_one();

        let early = tokio::time::timeout(Duration::from_millis(10), sim.wait_idle()).await;
        assert!(early.is_err());
        assert!(!sim.shared.tracker.is_closed());

        sim.wait_idle().await;
        assert_eq!(sim.registry().pending_count(), 0);
    }
}
