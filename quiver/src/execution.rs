//! Property checks: tuple streams, trial outcomes, shrinking and reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{PropertyConfig, SamplingMode};
use crate::error::{FailureReport, GenerationError, PropertyError, TrialOutcome};
use crate::repository::GeneratorRepository;
use crate::rng::SourceOfRandomness;
use crate::sampler::{ExhaustiveStrategy, ParameterSetup, Provenance, SamplingStrategy, SeededValue};
use crate::shrink::Shrinker;
use crate::types::TypeDescriptor;
use crate::value::Value;

/// Runs the property body once for an argument tuple
pub trait PropertyTrialDriver {
    fn run_trial(&self, args: &[Value]) -> TrialOutcome;
}

impl<F> PropertyTrialDriver for F
where
    F: Fn(&[Value]) -> TrialOutcome,
{
    fn run_trial(&self, args: &[Value]) -> TrialOutcome {
        self(args)
    }
}

/// Result of a property run that got as far as executing trials
#[derive(Debug, Clone)]
pub enum PropertyOutcome {
    /// Every executed trial succeeded
    Verified { trials: usize, discards: usize },
    Falsified(Box<FailureReport>),
}

impl PropertyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, PropertyOutcome::Verified { .. })
    }

    pub fn failure(&self) -> Option<&FailureReport> {
        match self {
            PropertyOutcome::Falsified(report) => Some(report),
            PropertyOutcome::Verified { .. } => None,
        }
    }

    /// Turn a falsification into [`PropertyError::Falsified`]
    pub fn into_result(self) -> Result<usize, PropertyError> {
        match self {
            PropertyOutcome::Verified { trials, .. } => Ok(trials),
            PropertyOutcome::Falsified(report) => Err(PropertyError::Falsified(report)),
        }
    }
}

/// A named property with its parameter setups and run configuration
#[derive(Debug, Clone)]
pub struct PropertyCheck {
    name: String,
    parameters: Vec<ParameterSetup>,
    config: PropertyConfig,
}

impl PropertyCheck {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            config: PropertyConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PropertyConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a parameter; arguments are passed to the driver in this order
    pub fn parameter(mut self, parameter: ParameterSetup) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Append a parameter resolved through `repository`
    pub fn resolve_parameter(
        self,
        name: impl Into<String>,
        descriptor: TypeDescriptor,
        repository: &GeneratorRepository,
    ) -> Result<Self, PropertyError> {
        let parameter = ParameterSetup::resolve(name, descriptor, repository)?;
        Ok(self.parameter(parameter))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterSetup] {
        &self.parameters
    }

    pub fn config(&self) -> &PropertyConfig {
        &self.config
    }

    /// Run trials until the configured count is reached or one falsifies the property.
    ///
    /// Discarded tuples and assumption violations are counted and skipped. The
    /// first falsifying tuple is shrunk (when enabled) before it is reported.
    pub fn run(&self, driver: &dyn PropertyTrialDriver) -> Result<PropertyOutcome, PropertyError> {
        self.config.validate()?;
        let seed = self
            .config
            .seed
            .unwrap_or_else(|| SourceOfRandomness::from_entropy().seed());
        let mut master = SourceOfRandomness::new(seed);
        debug!(property = %self.name, seed, mode = ?self.config.mode, "running property");

        let tuples: Box<dyn Iterator<Item = Result<Vec<SeededValue>, GenerationError>> + '_> =
            match self.config.mode {
                SamplingMode::Sampling => Box::new(SamplingStrategy::new(
                    &self.parameters,
                    master,
                    self.config.trials,
                    self.config.max_discard_ratio,
                )),
                SamplingMode::Exhaustive => Box::new(
                    ExhaustiveStrategy::new(
                        &self.parameters,
                        &mut master,
                        self.config.exhaustive_cap,
                        self.config.max_discard_ratio,
                    )
                    .map_err(|source| self.generation_error(source))?,
                ),
            };

        let mut trials = 0;
        let mut discards = 0;
        for (trial, tuple) in tuples.enumerate() {
            let tuple = match tuple {
                Ok(tuple) => tuple,
                Err(error) if error.is_discard() => {
                    discards += 1;
                    debug!(property = %self.name, trial, %error, "trial discarded");
                    continue;
                }
                Err(error) => return Err(self.generation_error(error)),
            };

            let args: Vec<Value> = tuple.iter().map(|seeded| seeded.value.clone()).collect();
            match driver.run_trial(&args) {
                TrialOutcome::Success => trials += 1,
                TrialOutcome::AssumptionViolated(reason) => {
                    discards += 1;
                    debug!(property = %self.name, trial, %reason, "assumption violated");
                }
                TrialOutcome::Falsified(message) => {
                    let report = self.report(driver, trial, &tuple, args, message);
                    info!(
                        property = %self.name,
                        trial,
                        seeds = ?report.seeds,
                        fully_minimal = report.fully_minimal,
                        "property falsified"
                    );
                    return Ok(PropertyOutcome::Falsified(Box::new(report)));
                }
            }
        }

        if trials == 0 && discards > 0 {
            warn!(property = %self.name, discards, "every trial was discarded");
        }
        info!(property = %self.name, trials, discards, seed, "property verified");
        Ok(PropertyOutcome::Verified { trials, discards })
    }

    /// Recreate the argument tuple recorded in a failure report
    pub fn reproduce(&self, provenance: &[Provenance]) -> Result<Vec<Value>, PropertyError> {
        if provenance.len() != self.parameters.len() {
            return Err(self.generation_error(GenerationError::ComponentArityMismatch {
                generator: self.name.clone(),
                needed: self.parameters.len(),
                supplied: provenance.len(),
            }));
        }
        self.parameters
            .iter()
            .zip(provenance)
            .map(|(parameter, recorded)| {
                parameter
                    .recreate(recorded, self.config.exhaustive_cap)
                    .map_err(|source| self.generation_error(source))
            })
            .collect()
    }

    fn report(
        &self,
        driver: &dyn PropertyTrialDriver,
        trial: usize,
        tuple: &[SeededValue],
        original_args: Vec<Value>,
        original_failure: String,
    ) -> FailureReport {
        let seeds = tuple.iter().map(SeededValue::seed).collect();
        let provenance = tuple.iter().map(|seeded| seeded.provenance).collect();
        let mut report = FailureReport {
            property_name: self.name.clone(),
            trial,
            original_args,
            original_failure,
            minimal_args: None,
            minimal_failure: None,
            seeds,
            provenance,
            fully_minimal: false,
            shrink_substitutions: 0,
            shrink_duration: Duration::ZERO,
        };
        if !self.config.shrink.enabled {
            return report;
        }

        let result = Shrinker::new(&self.parameters, &self.config.shrink).shrink(
            driver,
            tuple,
            report.original_failure.clone(),
        );
        report.fully_minimal = result.is_fully_minimal();
        report.shrink_substitutions = result.substitutions;
        report.shrink_duration = result.duration;
        if result.minimal != report.original_args {
            report.minimal_args = Some(result.minimal);
            report.minimal_failure = Some(result.failure);
        }
        report
    }

    fn generation_error(&self, source: GenerationError) -> PropertyError {
        PropertyError::Generation {
            property: self.name.clone(),
            source,
        }
    }
}

/// Check independent properties concurrently, one property per worker at a time.
///
/// Results are returned in input order. Each check owns its randomness and
/// contexts; only the checks and drivers themselves are shared.
pub fn check_parallel(
    checks: &[(&PropertyCheck, &(dyn PropertyTrialDriver + Sync))],
) -> Vec<Result<PropertyOutcome, PropertyError>> {
    let workers = num_cpus::get().min(checks.len()).max(1);
    let next = AtomicUsize::new(0);
    let mut results: Vec<Option<Result<PropertyOutcome, PropertyError>>> =
        (0..checks.len()).map(|_| None).collect();

    let collected = crossbeam::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let next = &next;
                s.spawn(move |_| {
                    let mut finished = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some((check, driver)) = checks.get(index) else {
                            break;
                        };
                        let driver: &dyn PropertyTrialDriver = *driver;
                        finished.push((index, check.run(driver)));
                    }
                    finished
                })
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .flatten()
            .collect::<Vec<_>>()
    });

    for (index, result) in collected.unwrap_or_default() {
        results[index] = Some(result);
    }
    results
        .into_iter()
        .zip(checks)
        .map(|(result, (check, _))| {
            result.unwrap_or_else(|| Err(PropertyError::WorkerPanicked(check.name.clone())))
        })
        .collect()
}
