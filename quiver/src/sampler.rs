//! Per-parameter setups and the strategies that turn them into argument tuples.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::Directive;
use crate::context::{GenerationContext, GeometricDistribution};
use crate::error::{GenerationError, PropertyError};
use crate::generator::Generator;
use crate::repository::GeneratorRepository;
use crate::rng::SourceOfRandomness;
use crate::types::TypeDescriptor;
use crate::value::Value;

/// Rejects generated values that are unsuitable for a property
pub trait Constraint: Send + Sync {
    fn accepts(&self, value: &Value) -> bool;
}

impl<F> Constraint for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn accepts(&self, value: &Value) -> bool {
        self(value)
    }
}

/// How a parameter value is recreated after the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Generated from `seed` with the size budget of trial `trial`
    Generated { seed: i64, trial: usize },
    /// Entry `position` of the parameter's enumerated values, also-values first
    Enumerated { position: usize },
}

impl Provenance {
    /// The number reported as the value's seed
    pub fn seed(&self) -> i64 {
        match *self {
            Provenance::Generated { seed, .. } => seed,
            Provenance::Enumerated { position } => position as i64,
        }
    }
}

/// A generated value together with what regenerates it
#[derive(Debug, Clone, PartialEq)]
pub struct SeededValue {
    pub value: Value,
    pub provenance: Provenance,
    pub parameter_index: usize,
}

impl SeededValue {
    pub fn seed(&self) -> i64 {
        self.provenance.seed()
    }
}

/// Everything needed to generate, constrain and shrink one property parameter
#[derive(Clone)]
pub struct ParameterSetup {
    name: String,
    descriptor: TypeDescriptor,
    generator: Box<dyn Generator>,
    constraint: Option<Arc<dyn Constraint>>,
    fixed_seed: Option<i64>,
    also_values: Vec<Value>,
}

impl ParameterSetup {
    /// Resolve the generator for `descriptor` through `repository`
    pub fn resolve(
        name: impl Into<String>,
        descriptor: TypeDescriptor,
        repository: &GeneratorRepository,
    ) -> Result<Self, PropertyError> {
        let name = name.into();
        match repository.generator_for(&descriptor) {
            Ok(generator) => Ok(Self::with_generator(name, descriptor, generator)),
            Err(source) => Err(PropertyError::Setup {
                parameter: name,
                type_name: descriptor.to_string(),
                source,
            }),
        }
    }

    /// Use an explicitly chosen generator; `descriptor` still supplies parameter-level directives
    pub fn with_generator(
        name: impl Into<String>,
        descriptor: TypeDescriptor,
        generator: Box<dyn Generator>,
    ) -> Self {
        let mut fixed_seed = None;
        let mut also_values = Vec::new();
        for directive in descriptor.directives() {
            match directive {
                Directive::FixedSeed(seed) => fixed_seed = Some(*seed),
                Directive::AlsoValues(values) => also_values.extend(values.iter().cloned()),
                _ => {}
            }
        }
        Self {
            name: name.into(),
            descriptor,
            generator,
            constraint: None,
            fixed_seed,
            also_values,
        }
    }

    /// Only accept generated values that satisfy `constraint`
    pub fn constrained(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraint = Some(Arc::new(constraint));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn fixed_seed(&self) -> Option<i64> {
        self.fixed_seed
    }

    pub fn also_values(&self) -> &[Value] {
        &self.also_values
    }

    pub fn accepts(&self, value: &Value) -> bool {
        self.constraint
            .as_ref()
            .is_none_or(|constraint| constraint.accepts(value))
    }

    /// Generate the value for `trial`, drawing a fresh seed from `master` for each attempt.
    ///
    /// Rejected values are retried until one is accepted or the context's
    /// discard ratio is exceeded.
    pub fn sample(
        &self,
        master: &mut SourceOfRandomness,
        trial: usize,
        parameter_index: usize,
        context: &mut GenerationContext,
    ) -> Result<SeededValue, GenerationError> {
        loop {
            let seed = self.fixed_seed.unwrap_or_else(|| master.next_long());
            let provenance = Provenance::Generated { seed, trial };
            if let Some(also) = self.also_values.get(trial) {
                return Ok(SeededValue {
                    value: also.clone(),
                    provenance,
                    parameter_index,
                });
            }

            let value = self.generate_from(seed, trial, context)?;
            if self.accepts(&value) {
                context.record_success();
                trace!(parameter = %self.name, seed, value = %value, "generated");
                return Ok(SeededValue {
                    value,
                    provenance,
                    parameter_index,
                });
            }
            debug!(parameter = %self.name, value = %value, "constraint rejected value");
            context.record_discard()?;
        }
    }

    /// Deterministically recreate the value generated from `seed` at `trial`
    pub fn regenerate(&self, seed: i64, trial: usize) -> Result<Value, GenerationError> {
        if let Some(also) = self.also_values.get(trial) {
            return Ok(also.clone());
        }
        let mut context = GenerationContext::new(0);
        self.generate_from(seed, trial, &mut context)
    }

    /// Also-values followed by the accepted members of the generator's domain, at most `cap` of them
    pub fn enumerated(&self, cap: usize) -> Vec<Value> {
        let mut values: Vec<Value> = Vec::new();
        for also in &self.also_values {
            if !values.contains(also) {
                values.push(also.clone());
            }
        }
        if let Some(domain) = self.generator.domain() {
            for member in domain {
                if values.len() >= cap {
                    break;
                }
                if self.accepts(&member) && !values.contains(&member) {
                    values.push(member);
                }
            }
        }
        values.truncate(cap);
        values
    }

    /// Recreate a value from its recorded provenance; `cap` bounds the enumerated values
    pub fn recreate(&self, provenance: &Provenance, cap: usize) -> Result<Value, GenerationError> {
        match *provenance {
            Provenance::Generated { seed, trial } => self.regenerate(seed, trial),
            Provenance::Enumerated { position } => self
                .enumerated(cap)
                .into_iter()
                .nth(position)
                .ok_or_else(|| GenerationError::MissingDomainEntry {
                    parameter: self.name.clone(),
                    position,
                }),
        }
    }

    fn generate_from(
        &self,
        seed: i64,
        trial: usize,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let mut random = SourceOfRandomness::new(seed);
        context.set_size(GeometricDistribution::size_for_trial(trial, &mut random));
        self.generator.generate(&mut random, context)
    }
}

impl fmt::Debug for ParameterSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSetup")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("constrained", &self.constraint.is_some())
            .field("fixed_seed", &self.fixed_seed)
            .field("also_values", &self.also_values)
            .finish()
    }
}

/// Independent random tuples, exactly `trials` of them.
///
/// Each trial gets its own [`GenerationContext`]; discard errors for one
/// trial are yielded as `Err` and the next trial proceeds normally.
pub struct SamplingStrategy<'a> {
    parameters: &'a [ParameterSetup],
    master: SourceOfRandomness,
    trials: usize,
    next_trial: usize,
    max_discard_ratio: f64,
}

impl<'a> SamplingStrategy<'a> {
    pub fn new(
        parameters: &'a [ParameterSetup],
        master: SourceOfRandomness,
        trials: usize,
        max_discard_ratio: f64,
    ) -> Self {
        Self {
            parameters,
            master,
            trials,
            next_trial: 0,
            max_discard_ratio,
        }
    }
}

impl Iterator for SamplingStrategy<'_> {
    type Item = Result<Vec<SeededValue>, GenerationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_trial >= self.trials {
            return None;
        }
        let trial = self.next_trial;
        self.next_trial += 1;

        let mut context = GenerationContext::with_discard_ratio(0, self.max_discard_ratio);
        Some(
            self.parameters
                .iter()
                .enumerate()
                .map(|(index, parameter)| {
                    parameter.sample(&mut self.master, trial, index, &mut context)
                })
                .collect(),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.trials - self.next_trial;
        (remaining, Some(remaining))
    }
}

/// The cartesian product of every parameter's finite domain.
///
/// Each domain is materialized up front (also-values first, capped at
/// `cap` entries); the product itself is walked lazily with one index per
/// parameter. Parameters without a finite domain contribute up to `cap`
/// generated values. Enumerated members record their position, generated
/// ones their seed and the position they were sampled at.
pub struct ExhaustiveStrategy {
    domains: Vec<Vec<SeededValue>>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl ExhaustiveStrategy {
    pub fn new(
        parameters: &[ParameterSetup],
        master: &mut SourceOfRandomness,
        cap: usize,
        max_discard_ratio: f64,
    ) -> Result<Self, GenerationError> {
        let domains = parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                Self::materialize(parameter, index, master, cap, max_discard_ratio)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let exhausted = domains.iter().any(Vec::is_empty);
        debug!(
            sizes = ?domains.iter().map(Vec::len).collect::<Vec<_>>(),
            "materialized exhaustive domains"
        );
        Ok(Self {
            cursor: vec![0; domains.len()],
            domains,
            exhausted,
        })
    }

    fn materialize(
        parameter: &ParameterSetup,
        parameter_index: usize,
        master: &mut SourceOfRandomness,
        cap: usize,
        max_discard_ratio: f64,
    ) -> Result<Vec<SeededValue>, GenerationError> {
        let mut seeded: Vec<SeededValue> = parameter
            .enumerated(cap)
            .into_iter()
            .enumerate()
            .map(|(position, value)| SeededValue {
                value,
                provenance: Provenance::Enumerated { position },
                parameter_index,
            })
            .collect();
        if parameter.generator().domain().is_some() {
            return Ok(seeded);
        }

        for trial in seeded.len()..cap {
            let mut context = GenerationContext::with_discard_ratio(0, max_discard_ratio);
            match parameter.sample(master, trial, parameter_index, &mut context) {
                Ok(value) => seeded.push(value),
                Err(error) if error.is_discard() => {
                    debug!(parameter = parameter.name(), %error, "skipping domain entry");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(seeded)
    }

    /// Number of tuples the full product contains, saturating at `usize::MAX`
    pub fn len(&self) -> usize {
        if self.domains.iter().any(Vec::is_empty) {
            return 0;
        }
        self.domains
            .iter()
            .fold(1usize, |total, domain| total.saturating_mul(domain.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance the odometer; the last parameter varies fastest
    fn advance(&mut self) {
        for position in (0..self.cursor.len()).rev() {
            self.cursor[position] += 1;
            if self.cursor[position] < self.domains[position].len() {
                return;
            }
            self.cursor[position] = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for ExhaustiveStrategy {
    type Item = Result<Vec<SeededValue>, GenerationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let tuple = self
            .cursor
            .iter()
            .zip(&self.domains)
            .map(|(&index, domain)| domain[index].clone())
            .collect();
        self.advance();
        Some(Ok(tuple))
    }
}
