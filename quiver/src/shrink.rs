//! Search for a simpler falsifying tuple.
//!
//! The [`Shrinker`] substitutes shrink candidates one parameter position at a
//! time, holding the others fixed, and keeps any substitution that still
//! falsifies the property. It stops in [`ShrinkState::MinimalFound`] once a
//! full pass over every position makes no progress, or in
//! [`ShrinkState::Exhausted`] when the [`ShrinkControl`] budget runs out.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::config::ShrinkControl;
use crate::error::TrialOutcome;
use crate::execution::PropertyTrialDriver;
use crate::rng::SourceOfRandomness;
use crate::sampler::{ParameterSetup, SeededValue};
use crate::value::{Value, render_arguments};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShrinkState {
    Searching,
    /// No candidate at any position still falsifies the property
    MinimalFound,
    /// The substitution, depth or time budget ran out first
    Exhausted,
}

/// Best counterexample a shrink search found
#[derive(Debug, Clone)]
pub struct ShrinkResult {
    pub minimal: Vec<Value>,
    /// Failure message produced by `minimal`
    pub failure: String,
    pub state: ShrinkState,
    /// Number of times the property was re-run with a candidate
    pub substitutions: usize,
    /// Number of accepted candidates
    pub steps: usize,
    pub duration: Duration,
}

impl ShrinkResult {
    pub fn is_fully_minimal(&self) -> bool {
        self.state == ShrinkState::MinimalFound
    }
}

pub struct Shrinker<'a> {
    parameters: &'a [ParameterSetup],
    control: &'a ShrinkControl,
    state: ShrinkState,
    substitutions: usize,
    steps: usize,
}

impl<'a> Shrinker<'a> {
    pub fn new(parameters: &'a [ParameterSetup], control: &'a ShrinkControl) -> Self {
        Self {
            parameters,
            control,
            state: ShrinkState::Searching,
            substitutions: 0,
            steps: 0,
        }
    }

    pub fn state(&self) -> ShrinkState {
        self.state
    }

    /// Shrink `original`, which falsified the property with `failure`.
    ///
    /// `control.enabled` is not consulted; callers decide whether to shrink.
    /// The minimal-counterexample handler, when configured, receives the
    /// result's tuple.
    pub fn shrink(
        mut self,
        driver: &dyn PropertyTrialDriver,
        original: &[SeededValue],
        failure: String,
    ) -> ShrinkResult {
        let started = Instant::now();
        let mut current: Vec<Value> = original.iter().map(|seeded| seeded.value.clone()).collect();
        let mut failure = failure;
        self.state = ShrinkState::Searching;

        'search: while self.state == ShrinkState::Searching {
            let mut improved = false;

            for position in 0..current.len().min(self.parameters.len()) {
                let parameter = &self.parameters[position];
                let generator = parameter.generator();
                let seed = original[position].seed();

                // Restart the scan at this position after each accepted candidate
                'position: loop {
                    let value = current[position].clone();
                    if !generator.can_shrink(&value) {
                        break;
                    }
                    let magnitude = generator.magnitude(&value);
                    let mut random = SourceOfRandomness::new(seed);

                    for candidate in generator.shrink(&mut random, &value) {
                        if candidate == value
                            || generator.magnitude(&candidate) > magnitude
                            || !parameter.accepts(&candidate)
                        {
                            continue;
                        }
                        if let Some(reason) = self.budget_exceeded(started) {
                            debug!(
                                reason,
                                substitutions = self.substitutions,
                                steps = self.steps,
                                "shrink budget exhausted"
                            );
                            self.state = ShrinkState::Exhausted;
                            break 'search;
                        }

                        self.substitutions += 1;
                        let mut attempt = current.clone();
                        attempt[position] = candidate;
                        match driver.run_trial(&attempt) {
                            TrialOutcome::Falsified(message) => {
                                self.steps += 1;
                                debug!(
                                    parameter = parameter.name(),
                                    value = %attempt[position],
                                    steps = self.steps,
                                    "accepted shrink candidate"
                                );
                                current = attempt;
                                failure = message;
                                improved = true;
                                continue 'position;
                            }
                            outcome => {
                                trace!(candidate = %attempt[position], ?outcome, "candidate rejected");
                            }
                        }
                    }
                    break;
                }
            }

            if !improved {
                self.state = ShrinkState::MinimalFound;
            }
        }

        let duration = started.elapsed();
        debug!(
            minimal = %render_arguments(&current),
            state = ?self.state,
            substitutions = self.substitutions,
            steps = self.steps,
            ?duration,
            "shrinking finished"
        );
        if let Some(ref handler) = self.control.on_minimal_counterexample {
            handler(&current);
        }

        ShrinkResult {
            minimal: current,
            failure,
            state: self.state,
            substitutions: self.substitutions,
            steps: self.steps,
            duration,
        }
    }

    fn budget_exceeded(&self, started: Instant) -> Option<&'static str> {
        if self.substitutions >= self.control.max_shrinks {
            Some("max_shrinks")
        } else if self.steps >= self.control.max_shrink_depth {
            Some("max_shrink_depth")
        } else if started.elapsed() >= self.control.max_shrink_time {
            Some("max_shrink_time")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::numeric::{IntegralGenerator, IntegralKind};
    use crate::primitives::BoolGenerator;
    use crate::sampler::Provenance;
    use crate::types::{TypeDescriptor, names};

    fn int_parameter() -> ParameterSetup {
        ParameterSetup::with_generator(
            "x",
            TypeDescriptor::named(names::I32),
            Box::new(IntegralGenerator::new(IntegralKind::I32)),
        )
    }

    fn seeded(values: &[Value]) -> Vec<SeededValue> {
        values
            .iter()
            .enumerate()
            .map(|(index, value)| SeededValue {
                value: value.clone(),
                provenance: Provenance::Generated { seed: 17, trial: 0 },
                parameter_index: index,
            })
            .collect()
    }

    fn below_fifty(args: &[Value]) -> TrialOutcome {
        match args[0].as_i64() {
            Some(x) if x >= 50 => TrialOutcome::falsified(format!("{} is not below 50", x)),
            _ => TrialOutcome::Success,
        }
    }

    #[test]
    fn test_shrinks_to_the_boundary() {
        let parameters = vec![int_parameter()];
        let control = ShrinkControl::default();
        let result = Shrinker::new(&parameters, &control).shrink(
            &below_fifty,
            &seeded(&[Value::I32(237)]),
            "237 is not below 50".to_string(),
        );
        assert_eq!(result.minimal, vec![Value::I32(50)]);
        assert_eq!(result.failure, "50 is not below 50");
        assert!(result.is_fully_minimal());
        assert_eq!(result.steps, 4);
        // 19 substitutions reach 50, then a confirming pass tries its 6 candidates
        assert_eq!(result.substitutions, 25);
    }

    #[test]
    fn test_substitution_budget_is_respected() {
        let parameters = vec![int_parameter()];
        let control = ShrinkControl::with_max_shrinks(3);
        let result = Shrinker::new(&parameters, &control).shrink(
            &below_fifty,
            &seeded(&[Value::I32(237)]),
            "237 is not below 50".to_string(),
        );
        assert_eq!(result.state, ShrinkState::Exhausted);
        assert_eq!(result.substitutions, 3);
        assert_eq!(result.minimal, vec![Value::I32(119)]);
    }

    #[test]
    fn test_depth_budget_is_respected() {
        let parameters = vec![int_parameter()];
        let control = ShrinkControl::default().max_shrink_depth(2);
        let result = Shrinker::new(&parameters, &control).shrink(
            &below_fifty,
            &seeded(&[Value::I32(237)]),
            "237 is not below 50".to_string(),
        );
        assert_eq!(result.state, ShrinkState::Exhausted);
        assert_eq!(result.steps, 2);
        assert_eq!(result.minimal, vec![Value::I32(60)]);
    }

    #[test]
    fn test_positions_shrink_independently() {
        let parameters = vec![
            ParameterSetup::with_generator(
                "flag",
                TypeDescriptor::named(names::BOOL),
                Box::new(BoolGenerator),
            ),
            int_parameter(),
        ];
        let control = ShrinkControl::default();
        let driver = |args: &[Value]| match args[1].as_i64() {
            Some(x) if x > 10 => TrialOutcome::falsified("too big"),
            _ => TrialOutcome::Success,
        };
        let result = Shrinker::new(&parameters, &control).shrink(
            &driver,
            &seeded(&[Value::Bool(true), Value::I32(900)]),
            "too big".to_string(),
        );
        assert!(result.is_fully_minimal());
        assert_eq!(result.minimal, vec![Value::Bool(false), Value::I32(11)]);
    }

    #[test]
    fn test_constraints_filter_candidates() {
        let parameters = vec![int_parameter().constrained(|value: &Value| {
            value.as_i64().is_some_and(|x| x % 2 == 1)
        })];
        let control = ShrinkControl::default().max_shrink_depth(1_000);
        let control = ShrinkControl {
            max_shrinks: 10_000,
            ..control
        };
        let result = Shrinker::new(&parameters, &control).shrink(
            &below_fifty,
            &seeded(&[Value::I32(237)]),
            "237 is not below 50".to_string(),
        );
        let x = result.minimal[0].as_i64().unwrap();
        assert!(x >= 50 && x % 2 == 1 && x < 237, "unexpected {}", x);
        assert!(x < 119);
    }

    #[test]
    fn test_handler_receives_the_minimal_tuple() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let control = ShrinkControl::default().on_minimal_counterexample(move |args: &[Value]| {
            assert_eq!(args, &[Value::I32(50)]);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let parameters = vec![int_parameter()];
        Shrinker::new(&parameters, &control).shrink(
            &below_fifty,
            &seeded(&[Value::I32(237)]),
            "237 is not below 50".to_string(),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_already_minimal_tuple() {
        let parameters = vec![int_parameter()];
        let control = ShrinkControl::default();
        let always = |_: &[Value]| TrialOutcome::falsified("always");
        let result = Shrinker::new(&parameters, &control).shrink(
            &always,
            &seeded(&[Value::I32(0)]),
            "always".to_string(),
        );
        assert!(result.is_fully_minimal());
        assert_eq!(result.substitutions, 0);
        assert_eq!(result.minimal, vec![Value::I32(0)]);
    }
}
