//! Simulation configuration.
//!
//! Configuration can be loaded from:
//! 1. TOML file (`.promise-sim.toml`)
//! 2. Environment variables (with `PROMISE_SIM_` prefix)
//!
//! Environment variables override TOML configuration.
//!
//! # Example TOML Configuration
//!
//! ```toml
//! [simulation]
//! tick_ms = 100
//! min_duration_ms = 1000
//! max_duration_ms = 3000
//! failure_probability = 0.2
//! seed = 42
//! chain_mode = "sequential"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::outcome::{
    RandomOutcomes, DEFAULT_FAILURE_PROBABILITY, DEFAULT_MAX_DURATION, DEFAULT_MIN_DURATION,
};

/// Default config file looked up by [`SimConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = ".promise-sim.toml";

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "PROMISE_SIM_";

/// How the chain combinator starts its units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    /// Every unit starts when the chain is built; results are awaited and
    /// logged in order. Total time is that of the slowest unit.
    #[default]
    Eager,
    /// Unit i+1 starts only after unit i resolved. A failure stops the chain
    /// and later units never start.
    Sequential,
}

impl fmt::Display for ChainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainMode::Eager => write!(f, "eager"),
            ChainMode::Sequential => write!(f, "sequential"),
        }
    }
}

impl FromStr for ChainMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(ChainMode::Eager),
            "sequential" => Ok(ChainMode::Sequential),
            other => Err(ConfigError::validation(format!(
                "unknown chain_mode '{other}' (expected 'eager' or 'sequential')"
            ))),
        }
    }
}

/// Tunables of the simulation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Elapsed-time observation resolution in milliseconds.
    pub tick_ms: u64,

    /// Lower bound of drawn durations in milliseconds (inclusive).
    pub min_duration_ms: u64,

    /// Upper bound of drawn durations in milliseconds (exclusive).
    pub max_duration_ms: u64,

    /// Probability that a unit fails (0.0 - 1.0).
    pub failure_probability: f64,

    /// Seed for reproducible outcome draws. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Chain combinator behavior.
    pub chain_mode: ChainMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            min_duration_ms: DEFAULT_MIN_DURATION.as_millis() as u64,
            max_duration_ms: DEFAULT_MAX_DURATION.as_millis() as u64,
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
            seed: None,
            chain_mode: ChainMode::Eager,
        }
    }
}

impl SimConfig {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. `.promise-sim.toml` in the working directory, if present
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Like [`SimConfig::load`] with an explicit file path. Only a missing
    /// file falls back to defaults; any other read failure is an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    source,
                    path: path.display().to_string(),
                })
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            source,
            path: path.display().to_string(),
        })?;
        let mut config = Self::from_toml(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML content. A missing `[simulation]` table
    /// yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct FullConfig {
            #[serde(default)]
            simulation: SimConfig,
        }

        let full: FullConfig = toml::from_str(content)?;
        Ok(full.simulation)
    }

    /// Apply `PROMISE_SIM_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup`, which receives the full
    /// variable name. Unparseable values are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("TICK_MS") {
            override_parsed(&mut self.tick_ms, "TICK_MS", &v);
        }
        if let Some(v) = var("MIN_DURATION_MS") {
            override_parsed(&mut self.min_duration_ms, "MIN_DURATION_MS", &v);
        }
        if let Some(v) = var("MAX_DURATION_MS") {
            override_parsed(&mut self.max_duration_ms, "MAX_DURATION_MS", &v);
        }
        if let Some(v) = var("FAILURE_PROBABILITY") {
            override_parsed(&mut self.failure_probability, "FAILURE_PROBABILITY", &v);
        }
        if let Some(v) = var("SEED") {
            match v.trim().parse() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => warn_ignored("SEED", &v),
            }
        }
        if let Some(v) = var("CHAIN_MODE") {
            override_parsed(&mut self.chain_mode, "CHAIN_MODE", &v);
        }
    }

    /// Checks that the values describe a usable simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::validation("tick_ms must be greater than 0"));
        }
        if self.min_duration_ms == 0 {
            return Err(ConfigError::validation(
                "min_duration_ms must be greater than 0",
            ));
        }
        if self.min_duration_ms >= self.max_duration_ms {
            return Err(ConfigError::validation(format!(
                "min_duration_ms ({}) must be less than max_duration_ms ({})",
                self.min_duration_ms, self.max_duration_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(ConfigError::validation(format!(
                "failure_probability must be within [0, 1], got {}",
                self.failure_probability
            )));
        }
        Ok(())
    }

    /// Elapsed-time tick as a [`Duration`].
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Builds the outcome source this configuration describes.
    pub fn outcomes(&self) -> RandomOutcomes {
        let source = match self.seed {
            Some(seed) => RandomOutcomes::seeded(seed),
            None => RandomOutcomes::from_entropy(),
        };
        source
            .with_duration_range(
                Duration::from_millis(self.min_duration_ms),
                Duration::from_millis(self.max_duration_ms),
            )
            .with_failure_probability(self.failure_probability)
    }
}

fn override_parsed<T: FromStr>(slot: &mut T, name: &str, raw: &str) {
    match raw.trim().parse() {
        Ok(v) => *slot = v,
        Err(_) => warn_ignored(name, raw),
    }
}

fn warn_ignored(name: &str, raw: &str) {
    tracing::warn!(variable = %format!("{ENV_PREFIX}{name}"), value = raw, "Ignoring unparseable override");
}
