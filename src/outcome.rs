//! Outcome generation: how long a unit runs and whether it fails.
//!
//! A draw is taken once, synchronously, when a unit is invoked. The drawn
//! duration is the wait itself, so the verdict is known before the timer
//! starts and nothing is decided at completion time. Durations have
//! millisecond resolution, the granularity of the runtime's timers.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

/// Default lower bound of the drawn duration (inclusive).
pub const DEFAULT_MIN_DURATION: Duration = Duration::from_millis(1000);

/// Default upper bound of the drawn duration (exclusive).
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_millis(3000);

/// Default probability that a unit fails.
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.2;

/// One ephemeral outcome draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeDraw {
    /// How long the unit waits before settling.
    pub duration: Duration,
    /// Whether the unit settles as a failure.
    pub will_fail: bool,
}

impl OutcomeDraw {
    /// A draw that succeeds after `secs` seconds, rounded to the millisecond.
    pub fn success_after(secs: f64) -> Self {
        Self {
            duration: millis_from_secs(secs),
            will_fail: false,
        }
    }

    /// A draw that fails after `secs` seconds, rounded to the millisecond.
    pub fn failure_after(secs: f64) -> Self {
        Self {
            duration: millis_from_secs(secs),
            will_fail: true,
        }
    }

    /// The drawn duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

fn millis_from_secs(secs: f64) -> Duration {
    Duration::from_millis((secs.max(0.0) * 1000.0).round() as u64)
}

/// A source of outcome draws.
///
/// The engine owns exactly one source and serializes access to it, so
/// implementations only need to be `Send`.
pub trait OutcomeSource: Send {
    /// Produces the next draw.
    fn draw(&mut self) -> OutcomeDraw;
}

/// Draws durations uniformly from `[min, max)` and failures with a fixed
/// probability, independently per invocation.
///
/// # Examples
///
/// ```
/// use promise_sim::outcome::{OutcomeSource, RandomOutcomes};
///
/// let mut a = RandomOutcomes::seeded(7);
/// let mut b = RandomOutcomes::seeded(7);
/// assert_eq!(a.draw(), b.draw());
///
/// let draw = a.draw();
/// assert!(draw.duration_secs() >= 1.0 && draw.duration_secs() < 3.0);
/// ```
pub struct RandomOutcomes {
    rng: StdRng,
    min_ms: u64,
    max_ms: u64,
    failure_probability: f64,
}

impl RandomOutcomes {
    /// A source with the default distribution, seeded from the thread RNG.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }

    /// A reproducible source with the default distribution.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            min_ms: DEFAULT_MIN_DURATION.as_millis() as u64,
            max_ms: DEFAULT_MAX_DURATION.as_millis() as u64,
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
        }
    }

    /// Overrides the duration range. Callers validate `min < max`; an empty
    /// range collapses to `min`.
    pub fn with_duration_range(mut self, min: Duration, max: Duration) -> Self {
        self.min_ms = min.as_millis() as u64;
        self.max_ms = max.as_millis() as u64;
        self
    }

    /// Overrides the failure probability, clamped into `[0, 1]`.
    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability.clamp(0.0, 1.0);
        self
    }
}

impl OutcomeSource for RandomOutcomes {
    fn draw(&mut self) -> OutcomeDraw {
        let millis = if self.max_ms > self.min_ms {
            self.rng.random_range(self.min_ms..self.max_ms)
        } else {
            self.min_ms
        };
        let will_fail = self.rng.random_bool(self.failure_probability);
        tracing::debug!(duration_ms = millis, will_fail, "Outcome drawn");
        OutcomeDraw {
            duration: Duration::from_millis(millis),
            will_fail,
        }
    }
}

impl fmt::Debug for RandomOutcomes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomOutcomes")
            .field("min_ms", &self.min_ms)
            .field("max_ms", &self.max_ms)
            .field("failure_probability", &self.failure_probability)
            .finish()
    }
}

/// Replays a fixed queue of draws, then repeats a fallback draw.
///
/// Useful when a run must be exactly reproducible, e.g. to show that a
/// chain logs in submission order even when its second unit settles first.
///
/// # Examples
///
/// ```
/// use promise_sim::outcome::{OutcomeDraw, OutcomeSource, ScriptedOutcomes};
///
/// let mut source = ScriptedOutcomes::new([OutcomeDraw::failure_after(1.5)]);
/// assert!(source.draw().will_fail);
/// assert!(!source.draw().will_fail); // fallback
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedOutcomes {
    queue: VecDeque<OutcomeDraw>,
    fallback: OutcomeDraw,
}

impl ScriptedOutcomes {
    /// Creates a script; the fallback succeeds after the minimum duration.
    pub fn new(draws: impl IntoIterator<Item = OutcomeDraw>) -> Self {
        Self {
            queue: draws.into_iter().collect(),
            fallback: OutcomeDraw {
                duration: DEFAULT_MIN_DURATION,
                will_fail: false,
            },
        }
    }

    /// Sets the draw returned once the script is exhausted.
    pub fn with_fallback(mut self, fallback: OutcomeDraw) -> Self {
        self.fallback = fallback;
        self
    }

    /// Number of scripted draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl OutcomeSource for ScriptedOutcomes {
    fn draw(&mut self) -> OutcomeDraw {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_are_reproducible() {
        let mut a = RandomOutcomes::seeded(42);
        let mut b = RandomOutcomes::seeded(42);
        for _ in 0..20 {
            assert_eq!(a.draw(), b.draw());
        }
    }

    #[test]
    fn draws_stay_in_default_range() {
        let mut source = RandomOutcomes::seeded(1);
        for _ in 0..1_000 {
            let secs = source.draw().duration_secs();
            assert!((1.0..3.0).contains(&secs), "out of range: {secs}");
        }
    }

    #[test]
    fn custom_range_is_respected() {
        let mut source = RandomOutcomes::seeded(3)
            .with_duration_range(Duration::from_millis(200), Duration::from_millis(300));
        for _ in 0..200 {
            let secs = source.draw().duration_secs();
            assert!((0.2..0.3).contains(&secs), "out of range: {secs}");
        }
    }

    #[test]
    fn probability_extremes() {
        let mut never = RandomOutcomes::seeded(5).with_failure_probability(0.0);
        let mut always = RandomOutcomes::seeded(5).with_failure_probability(1.0);
        for _ in 0..100 {
            assert!(!never.draw().will_fail);
            assert!(always.draw().will_fail);
        }
    }

    #[test]
    fn degenerate_range_collapses_to_min() {
        let mut source = RandomOutcomes::seeded(9)
            .with_duration_range(Duration::from_millis(500), Duration::from_millis(500));
        assert_eq!(source.draw().duration, Duration::from_millis(500));
    }

    #[test]
    fn scripted_durations_round_to_millis() {
        assert_eq!(
            OutcomeDraw::success_after(2.9).duration,
            Duration::from_millis(2900)
        );
        assert_eq!(
            OutcomeDraw::failure_after(1.0004).duration,
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn script_replays_then_falls_back() {
        let mut source = ScriptedOutcomes::new([
            OutcomeDraw::success_after(2.0),
            OutcomeDraw::failure_after(1.0),
        ])
        .with_fallback(OutcomeDraw::failure_after(2.5));

        assert_eq!(source.remaining(), 2);
        assert_eq!(source.draw(), OutcomeDraw::success_after(2.0));
        assert_eq!(source.draw(), OutcomeDraw::failure_after(1.0));
        assert_eq!(source.remaining(), 0);
        assert_eq!(source.draw(), OutcomeDraw::failure_after(2.5));
        assert_eq!(source.draw(), OutcomeDraw::failure_after(2.5));
    }
}
