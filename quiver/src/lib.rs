#![allow(clippy::result_large_err)]

//! # Quiver - Input Generation and Shrinking for Property Tests
//!
//! Quiver resolves a generator for each parameter of a property from an
//! explicit type descriptor, streams argument tuples (random sampling or the
//! exhaustive product of small domains), and shrinks the first falsifying
//! tuple to a simpler counterexample that can be regenerated from its seeds.
//!
//! ## Quick Start
//!
//! ```rust
//! use quiver::{
//!     Directive, GeneratorRepository, PropertyCheck, PropertyConfig, TrialOutcome,
//!     TypeDescriptor, Value, names,
//! };
//!
//! let repository = GeneratorRepository::with_builtins();
//! let check = PropertyCheck::new("below_fifty")
//!     .with_config(PropertyConfig::seeded(7))
//!     .resolve_parameter(
//!         "x",
//!         TypeDescriptor::named(names::I32).with_directive(Directive::in_range(0, 500)),
//!         &repository,
//!     )
//!     .unwrap();
//!
//! let outcome = check
//!     .run(&|args: &[Value]| match args[0].as_i64() {
//!         Some(x) if x >= 50 => TrialOutcome::falsified(format!("{} >= 50", x)),
//!         _ => TrialOutcome::Success,
//!     })
//!     .unwrap();
//!
//! let report = outcome.failure().unwrap();
//! assert_eq!(report.counterexample(), &[Value::I32(50)]);
//! ```

pub mod collections;
pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod generator;
pub mod numeric;
pub mod primitives;
pub mod range;
pub mod repository;
pub mod rng;
pub mod sampler;
pub mod shrink;
pub mod types;
pub mod value;

// Re-export the main public API
pub use collections::{
    CollectionGenerator, CollectionKind, FunctionGenerator, MapGenerator, OptionalGenerator,
    TupleGenerator,
};
pub use config::{
    ConfigError, Directive, MinimalCounterexampleHandler, PropertyConfig, SamplingMode,
    ShrinkControl,
};
pub use context::{GenerationContext, GeometricDistribution};
pub use error::{FailureReport, GenerationError, PropertyError, TrialOutcome};
pub use execution::{PropertyCheck, PropertyOutcome, PropertyTrialDriver, check_parallel};
pub use generator::{
    Components, CompositeGenerator, FixedValuesGenerator, Generator, GeneratorShape,
    NullableGenerator,
};
pub use numeric::{DecimalGenerator, FloatGenerator, FloatKind, IntegralGenerator, IntegralKind};
pub use primitives::{
    BoolGenerator, CharGenerator, DurationGenerator, EnumGenerator, InstantGenerator,
    StringGenerator,
};
pub use repository::GeneratorRepository;
pub use rng::SourceOfRandomness;
pub use sampler::{
    Constraint, ExhaustiveStrategy, ParameterSetup, Provenance, SamplingStrategy, SeededValue,
};
pub use shrink::{ShrinkResult, ShrinkState, Shrinker};
pub use types::{TypeDescriptor, TypeHierarchy, names};
pub use value::{GeneratedFunction, Value};
