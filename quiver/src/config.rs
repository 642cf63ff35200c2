//! Configuration types for controlling property runs and generator directives.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::value::Value;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid number of trials (must be > 0)
    #[error("Invalid trials count: {0} (must be > 0)")]
    InvalidTrials(usize),
    /// Invalid discard ratio (must be finite and >= 0)
    #[error("Invalid max discard ratio: {0} (must be finite and >= 0)")]
    InvalidDiscardRatio(f64),
    /// Invalid shrink budget (must be > 0 when shrinking is enabled)
    #[error("Invalid shrink budget: {0} (must be > 0)")]
    InvalidShrinkBudget(usize),
    /// Invalid exhaustive cap (must be > 0)
    #[error("Invalid exhaustive cap: {0} (must be > 0)")]
    InvalidExhaustiveCap(usize),
}

/// A configuration directive attached to a type descriptor or parameter.
///
/// Range bounds are strings parsed by the receiving generator, so one
/// directive serves every numeric width as well as chars, instants (RFC 3339)
/// and durations (decimal seconds).
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    InRange {
        min: Option<String>,
        max: Option<String>,
    },
    /// Decimal scale for decimal generators
    Precision { scale: u32 },
    /// Length bounds for strings, collections, maps and arrays
    Size { min: usize, max: usize },
    NullProbability(f64),
    /// The parameter takes only these values
    OnlyValues(Vec<Value>),
    /// The parameter takes these values first, then generated ones
    AlsoValues(Vec<Value>),
    MatchingPattern(String),
    /// Seed every value of the parameter with this seed
    FixedSeed(i64),
}

impl Directive {
    pub fn in_range(min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Directive::InRange {
            min: Some(min.to_string()),
            max: Some(max.to_string()),
        }
    }

    pub fn at_least(min: impl fmt::Display) -> Self {
        Directive::InRange {
            min: Some(min.to_string()),
            max: None,
        }
    }

    pub fn at_most(max: impl fmt::Display) -> Self {
        Directive::InRange {
            min: None,
            max: Some(max.to_string()),
        }
    }

    pub fn size(min: usize, max: usize) -> Self {
        Directive::Size { min, max }
    }

    pub fn precision(scale: u32) -> Self {
        Directive::Precision { scale }
    }

    /// Directives consumed by parameter setup rather than by `configure`
    pub fn is_parameter_level(&self) -> bool {
        matches!(
            self,
            Directive::NullProbability(_)
                | Directive::OnlyValues(_)
                | Directive::AlsoValues(_)
                | Directive::FixedSeed(_)
        )
    }
}

/// How parameter generators are turned into argument tuples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// `trials` independently sampled tuples
    Sampling,
    /// Cartesian product of each parameter's finite domain
    Exhaustive,
}

/// Callback invoked with the final minimal counterexample
pub type MinimalCounterexampleHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Shrinking policy
#[derive(Clone)]
pub struct ShrinkControl {
    pub enabled: bool,
    /// Maximum number of trial substitutions
    pub max_shrinks: usize,
    /// Maximum number of accepted shrink steps
    pub max_shrink_depth: usize,
    pub max_shrink_time: Duration,
    pub on_minimal_counterexample: Option<MinimalCounterexampleHandler>,
}

impl Default for ShrinkControl {
    fn default() -> Self {
        Self {
            enabled: true,
            max_shrinks: 100,
            max_shrink_depth: 20,
            max_shrink_time: Duration::from_secs(60),
            on_minimal_counterexample: None,
        }
    }
}

impl ShrinkControl {
    /// Shrinking switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_max_shrinks(max_shrinks: usize) -> Self {
        Self {
            max_shrinks,
            ..Default::default()
        }
    }

    pub fn max_shrink_depth(mut self, depth: usize) -> Self {
        self.max_shrink_depth = depth;
        self
    }

    pub fn max_shrink_time(mut self, time: Duration) -> Self {
        self.max_shrink_time = time;
        self
    }

    pub fn on_minimal_counterexample(
        mut self,
        handler: impl Fn(&[Value]) + Send + Sync + 'static,
    ) -> Self {
        self.on_minimal_counterexample = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for ShrinkControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShrinkControl")
            .field("enabled", &self.enabled)
            .field("max_shrinks", &self.max_shrinks)
            .field("max_shrink_depth", &self.max_shrink_depth)
            .field("max_shrink_time", &self.max_shrink_time)
            .field(
                "on_minimal_counterexample",
                &self.on_minimal_counterexample.is_some(),
            )
            .finish()
    }
}

/// Configuration for a single property
#[derive(Debug, Clone)]
pub struct PropertyConfig {
    /// Number of trials in sampling mode
    pub trials: usize,
    pub mode: SamplingMode,
    /// Seed for the run's master randomness; drawn from entropy when absent
    pub seed: Option<i64>,
    /// Discards tolerated per success before a trial gives up
    pub max_discard_ratio: f64,
    /// Number of values materialized for a non-finite parameter in exhaustive mode
    pub exhaustive_cap: usize,
    pub shrink: ShrinkControl,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self {
            trials: 100,
            mode: SamplingMode::Sampling,
            seed: None,
            max_discard_ratio: 10.0,
            exhaustive_cap: 100,
            shrink: ShrinkControl::default(),
        }
    }
}

impl PropertyConfig {
    /// Sampling-mode configuration with a fixed seed
    pub fn seeded(seed: i64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn mode(mut self, mode: SamplingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn shrink(mut self, shrink: ShrinkControl) -> Self {
        self.shrink = shrink;
        self
    }

    pub fn max_discard_ratio(mut self, ratio: f64) -> Self {
        self.max_discard_ratio = ratio;
        self
    }

    pub fn exhaustive_cap(mut self, cap: usize) -> Self {
        self.exhaustive_cap = cap;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::InvalidTrials(self.trials));
        }
        if !self.max_discard_ratio.is_finite() || self.max_discard_ratio < 0.0 {
            return Err(ConfigError::InvalidDiscardRatio(self.max_discard_ratio));
        }
        if self.exhaustive_cap == 0 {
            return Err(ConfigError::InvalidExhaustiveCap(self.exhaustive_cap));
        }
        if self.shrink.enabled && self.shrink.max_shrinks == 0 {
            return Err(ConfigError::InvalidShrinkBudget(self.shrink.max_shrinks));
        }
        Ok(())
    }
}
