//! Error types and failure reporting for property trials.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::sampler::Provenance;
use crate::value::{Value, render_arguments};

/// Errors raised while configuring, resolving or running generators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// A configured or requested range has `min > max`
    #[error("Illegal range: min {min} is greater than max {max}")]
    IllegalRange { min: String, max: String },

    /// No generator is registered for the requested type
    #[error("Cannot find generator for type {0}")]
    UnresolvedType(String),

    /// A componentized generator received the wrong number of components
    #[error("Generator for {generator} needs {needed} component generator(s), but was given {supplied}")]
    ComponentArityMismatch {
        generator: String,
        needed: usize,
        supplied: usize,
    },

    /// The discard-to-success ratio exceeded the configured threshold
    #[error("Too many discards: {discards} discards against {successes} successes (max ratio {max_ratio})")]
    TooManyDiscards {
        discards: usize,
        successes: usize,
        max_ratio: f64,
    },

    /// A generated value was rejected by a constraint
    #[error("Assumption violated: {0}")]
    AssumptionViolated(String),

    /// The generator does not understand the directive
    #[error("Generator for {generator} does not accept directive {directive}")]
    UnsupportedDirective { generator: String, directive: String },

    /// The directive is malformed
    #[error("Invalid directive {directive}: {reason}")]
    InvalidDirective { directive: String, reason: String },

    /// A uniform choice was requested from an empty collection
    #[error("Cannot choose from an empty collection")]
    EmptyChoice,

    /// A recorded position lies past the parameter's enumerated values
    #[error("Parameter {parameter} has no enumerated value at position {position}")]
    MissingDomainEntry { parameter: String, position: usize },
}

impl GenerationError {
    pub fn illegal_range(min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Self::IllegalRange {
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn unsupported_directive(generator: impl Into<String>, directive: impl fmt::Debug) -> Self {
        Self::UnsupportedDirective {
            generator: generator.into(),
            directive: format!("{:?}", directive),
        }
    }

    pub fn invalid_directive(directive: impl fmt::Debug, reason: impl Into<String>) -> Self {
        Self::InvalidDirective {
            directive: format!("{:?}", directive),
            reason: reason.into(),
        }
    }

    /// Whether the error only abandons the current trial.
    ///
    /// Discards are recovered locally; everything else is a test-authoring defect.
    pub fn is_discard(&self) -> bool {
        matches!(
            self,
            GenerationError::TooManyDiscards { .. } | GenerationError::AssumptionViolated(_)
        )
    }
}

/// Outcome of one property invocation
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Success,
    /// The property discarded the arguments
    AssumptionViolated(String),
    /// The property's assertion failed
    Falsified(String),
}

impl TrialOutcome {
    pub fn falsified(message: impl Into<String>) -> Self {
        Self::Falsified(message.into())
    }

    pub fn is_falsified(&self) -> bool {
        matches!(self, TrialOutcome::Falsified(_))
    }
}

/// Everything needed to understand and reproduce a falsified property
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub property_name: String,
    /// Trial index the original failure occurred at
    pub trial: usize,
    pub original_args: Vec<Value>,
    pub original_failure: String,
    /// Present when shrinking found a smaller counterexample
    pub minimal_args: Option<Vec<Value>>,
    pub minimal_failure: Option<String>,
    /// One seed per parameter for the original tuple
    pub seeds: Vec<i64>,
    /// One entry per parameter; feed to `PropertyCheck::reproduce`
    pub provenance: Vec<Provenance>,
    /// Whether the shrinker proved local minimality or ran out of budget
    pub fully_minimal: bool,
    pub shrink_substitutions: usize,
    pub shrink_duration: Duration,
}

impl FailureReport {
    /// The minimized arguments, falling back to the original ones
    pub fn counterexample(&self) -> &[Value] {
        self.minimal_args.as_deref().unwrap_or(&self.original_args)
    }

    /// Full multi-line report
    pub fn detailed_report(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!(
            "Property named '{}' failed ({})\n",
            self.property_name,
            self.minimal_failure
                .as_deref()
                .unwrap_or(&self.original_failure)
        ));
        report.push_str(&format!(
            "With arguments: {}\n",
            render_arguments(self.counterexample())
        ));
        report.push_str(&format!(
            "Seeds for reproduction: {:?} (trial {})\n",
            self.seeds, self.trial
        ));

        if let Some(ref minimal) = self.minimal_args {
            report.push_str(&format!(
                "Original failure message: {}\n",
                self.original_failure
            ));
            report.push_str(&format!(
                "Original arguments: {}\n",
                render_arguments(&self.original_args)
            ));
            report.push_str(&format!(
                "Shrunk arguments: {} after {} substitution(s) in {:?}{}\n",
                render_arguments(minimal),
                self.shrink_substitutions,
                self.shrink_duration,
                if self.fully_minimal {
                    ""
                } else {
                    " (best effort, shrink budget exhausted)"
                }
            ));
        }

        report
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Property named '{}' failed with arguments {} (seeds {:?})",
            self.property_name,
            render_arguments(self.counterexample()),
            self.seeds
        )
    }
}

/// Errors surfaced by a property run
#[derive(Error, Debug, Clone)]
pub enum PropertyError {
    /// A parameter could not be set up; the property is not runnable
    #[error("Cannot set up parameter '{parameter}' of type {type_name}: {source}")]
    Setup {
        parameter: String,
        type_name: String,
        #[source]
        source: GenerationError,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Generation failed mid-run for a reason other than a discard
    #[error("Generation failed for property '{property}': {source}")]
    Generation {
        property: String,
        #[source]
        source: GenerationError,
    },

    #[error("{0}")]
    Falsified(Box<FailureReport>),

    /// A worker thread panicked while checking the named property
    #[error("Worker checking property '{0}' panicked")]
    WorkerPanicked(String),
}
