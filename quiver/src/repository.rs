//! Type-directed generator resolution.

use std::collections::HashMap;

use tracing::trace;

use crate::collections::{
    CollectionGenerator, CollectionKind, FunctionGenerator, MapGenerator, OptionalGenerator,
    TupleGenerator,
};
use crate::config::Directive;
use crate::error::GenerationError;
use crate::generator::{
    CompositeGenerator, FixedValuesGenerator, Generator, GeneratorShape, NullableGenerator,
};
use crate::numeric::{DecimalGenerator, FloatGenerator, FloatKind, IntegralGenerator, IntegralKind};
use crate::primitives::{
    BoolGenerator, CharGenerator, DurationGenerator, EnumGenerator, InstantGenerator,
    StringGenerator,
};
use crate::types::{TypeDescriptor, TypeHierarchy, names};

/// Range of the stand-in generator for unconstrained type arguments
const SMALL_INT_MIN: i32 = -128;
const SMALL_INT_MAX: i32 = 127;

/// Registry of generator templates keyed by every type they can stand in for.
///
/// Registration walks each generator's declared types up the
/// [`TypeHierarchy`], so a generator registered for `i32` is also found when
/// `number` is requested. Containers and other componentized generators are
/// never attached to [`names::ANY`]. The repository is built once and then only read; resolving
/// hands out fresh copies, so it can be shared across threads.
pub struct GeneratorRepository {
    hierarchy: TypeHierarchy,
    generators: HashMap<String, Vec<Box<dyn Generator>>>,
}

impl GeneratorRepository {
    /// An empty repository over `hierarchy`
    pub fn new(hierarchy: TypeHierarchy) -> Self {
        Self {
            hierarchy,
            generators: HashMap::new(),
        }
    }

    /// The built-in hierarchy with every built-in generator registered
    pub fn with_builtins() -> Self {
        let mut repository = Self::new(TypeHierarchy::builtin());
        repository.register_builtins();
        repository
    }

    fn register_builtins(&mut self) {
        self.register(BoolGenerator);
        self.register(CharGenerator::new());
        for kind in IntegralKind::ALL {
            self.register(IntegralGenerator::new(kind));
        }
        self.register(FloatGenerator::new(FloatKind::F32));
        self.register(FloatGenerator::new(FloatKind::F64));
        self.register(DecimalGenerator::new());
        self.register(StringGenerator::new());
        self.register(CollectionGenerator::list());
        self.register(CollectionGenerator::set());
        self.register(MapGenerator::new());
        self.register(OptionalGenerator::new());
        self.register(TupleGenerator::pair());
        self.register(TupleGenerator::triple());
        self.register(FunctionGenerator::new());
        self.register(InstantGenerator::new());
        self.register(DurationGenerator::new());
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Declare a user type and its direct supertypes; do this before registering its generators
    pub fn declare_type(&mut self, name: impl Into<String>, supertypes: &[&str]) -> &mut Self {
        self.hierarchy.declare(name, supertypes);
        self
    }

    /// Register a generator under each of its types and all of their supertypes
    pub fn register(&mut self, generator: impl Generator + 'static) -> &mut Self {
        self.register_boxed(Box::new(generator))
    }

    pub fn register_boxed(&mut self, generator: Box<dyn Generator>) -> &mut Self {
        let generic = generator.shape() == GeneratorShape::Container
            || generator.number_of_needed_components() > 0;
        let mut targets: Vec<String> = Vec::new();
        for declared in generator.types() {
            for ancestor in self.hierarchy.ancestry(&declared) {
                if ancestor == names::ANY && generic {
                    continue;
                }
                if !targets.contains(&ancestor) {
                    targets.push(ancestor);
                }
            }
        }
        trace!(types = ?generator.types(), targets = ?targets, "registering generator");
        for target in targets {
            self.generators
                .entry(target)
                .or_default()
                .push(generator.copy());
        }
        self
    }

    /// Whether anything can be resolved for the raw type name
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Number of templates registered under `name`, counting supertype registrations
    pub fn generators_for(&self, name: &str) -> usize {
        self.generators.get(name).map_or(0, Vec::len)
    }

    /// Resolve a ready-to-use generator for `descriptor`.
    ///
    /// Every call returns an independent generator tree with components
    /// injected and the descriptor's directives applied.
    pub fn generator_for(
        &self,
        descriptor: &TypeDescriptor,
    ) -> Result<Box<dyn Generator>, GenerationError> {
        let generator: Box<dyn Generator> = match descriptor {
            TypeDescriptor::Array { element, .. } => {
                let element = self.generator_for(element)?;
                Box::new(CollectionGenerator::of(CollectionKind::Array, element)?)
            }
            TypeDescriptor::Enumeration { name, variants, .. } => {
                Box::new(EnumGenerator::new(name.clone(), variants.clone())?)
            }
            TypeDescriptor::Wildcard {
                lower: Some(bound), ..
            }
            | TypeDescriptor::Wildcard {
                upper: Some(bound), ..
            } => return self.generator_for(bound),
            TypeDescriptor::Wildcard { .. } | TypeDescriptor::Variable(_) => {
                return Self::unconstrained();
            }
            TypeDescriptor::Named { name, args, .. } => self.resolve_named(descriptor, name, args)?,
        };
        trace!(descriptor = %descriptor, "resolved generator");
        apply_directives(generator, descriptor)
    }

    fn resolve_named(
        &self,
        descriptor: &TypeDescriptor,
        name: &str,
        args: &[TypeDescriptor],
    ) -> Result<Box<dyn Generator>, GenerationError> {
        let templates = self
            .generators
            .get(name)
            .filter(|templates| !templates.is_empty())
            .ok_or_else(|| GenerationError::UnresolvedType(descriptor.to_string()))?;

        let mut matches = Vec::with_capacity(templates.len());
        for template in templates {
            let mut generator = template.copy();
            let needed = generator.number_of_needed_components();
            if needed > 0 {
                let components = self.components_for(descriptor, args, needed)?;
                generator.add_components(components)?;
            } else if !args.is_empty() && generator.types().iter().any(|t| t == name) {
                return Err(GenerationError::ComponentArityMismatch {
                    generator: name.to_string(),
                    needed: 0,
                    supplied: args.len(),
                });
            }
            matches.push(generator);
        }

        if matches.len() == 1 {
            Ok(matches.remove(0))
        } else {
            trace!(descriptor = %descriptor, candidates = matches.len(), "composing matches");
            Ok(Box::new(CompositeGenerator::new(matches)?))
        }
    }

    /// One generator per type argument; missing arguments stand for "don't care"
    fn components_for(
        &self,
        descriptor: &TypeDescriptor,
        args: &[TypeDescriptor],
        needed: usize,
    ) -> Result<Vec<Box<dyn Generator>>, GenerationError> {
        if args.is_empty() {
            return (0..needed).map(|_| Self::unconstrained()).collect();
        }
        if args.len() != needed {
            return Err(GenerationError::ComponentArityMismatch {
                generator: descriptor.to_string(),
                needed,
                supplied: args.len(),
            });
        }
        args.iter().map(|arg| self.generator_for(arg)).collect()
    }

    fn unconstrained() -> Result<Box<dyn Generator>, GenerationError> {
        Ok(Box::new(IntegralGenerator::in_range(
            IntegralKind::I32,
            SMALL_INT_MIN,
            SMALL_INT_MAX,
        )?))
    }
}

impl Default for GeneratorRepository {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Configure `generator` with the node's directives, then apply value-set overrides.
///
/// `OnlyValues` replaces the generator with a fixed-values generator and
/// `NullProbability` wraps it. `AlsoValues` and `FixedSeed` are left to the
/// parameter setup.
fn apply_directives(
    mut generator: Box<dyn Generator>,
    descriptor: &TypeDescriptor,
) -> Result<Box<dyn Generator>, GenerationError> {
    let directives = descriptor.directives();
    for directive in directives.iter().filter(|d| !d.is_parameter_level()) {
        generator.configure(directive)?;
    }

    if let Some(Directive::OnlyValues(values)) = directives
        .iter()
        .find(|d| matches!(d, Directive::OnlyValues(_)))
    {
        let type_name = generator.types().join("|");
        generator = Box::new(FixedValuesGenerator::new(type_name, values.clone())?);
    }

    if let Some(Directive::NullProbability(probability)) = directives
        .iter()
        .find(|d| matches!(d, Directive::NullProbability(_)))
    {
        generator = Box::new(NullableGenerator::new(generator, *probability)?);
    }

    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GenerationContext;
    use crate::rng::SourceOfRandomness;
    use crate::value::Value;

    fn sample(generator: &dyn Generator, seed: i64, count: usize) -> Vec<Value> {
        let mut random = SourceOfRandomness::new(seed);
        let mut context = GenerationContext::new(4);
        (0..count)
            .map(|_| generator.generate(&mut random, &mut context).unwrap())
            .collect()
    }

    #[test]
    fn test_concrete_type_resolution() {
        let repository = GeneratorRepository::with_builtins();
        let generator = repository
            .generator_for(&TypeDescriptor::named(names::I16))
            .unwrap();
        assert!(sample(generator.as_ref(), 1, 100)
            .iter()
            .all(|value| matches!(value, Value::I16(_))));
    }

    #[test]
    fn test_supertype_resolution_composes_matches() {
        let repository = GeneratorRepository::with_builtins();
        let generator = repository
            .generator_for(&TypeDescriptor::named(names::NUMBER))
            .unwrap();
        let values = sample(generator.as_ref(), 2, 200);
        assert!(values.iter().any(|v| matches!(v, Value::I32(_))));
        assert!(values.iter().any(|v| matches!(v, Value::F64(_))));
        assert!(!values.iter().any(|v| matches!(v, Value::Str(_))));
    }

    #[test]
    fn test_containers_are_not_offered_for_any() {
        let repository = GeneratorRepository::with_builtins();
        let generator = repository
            .generator_for(&TypeDescriptor::named(names::ANY))
            .unwrap();
        assert!(!generator
            .types()
            .iter()
            .any(|t| t == names::LIST || t == names::MAP || t == names::OPTIONAL));
        assert!(repository.generators_for(names::COLLECTION) >= 2);
    }

    #[test]
    fn test_unregistered_type_is_unresolved() {
        let repository = GeneratorRepository::with_builtins();
        assert_eq!(
            repository
                .generator_for(&TypeDescriptor::named("widget"))
                .err(),
            Some(GenerationError::UnresolvedType("widget".to_string()))
        );
    }

    #[test]
    fn test_generic_arguments_become_components() {
        let repository = GeneratorRepository::with_builtins();
        let descriptor = TypeDescriptor::generic(
            names::LIST,
            vec![TypeDescriptor::named(names::BOOL)],
        );
        let generator = repository.generator_for(&descriptor).unwrap();
        for value in sample(generator.as_ref(), 3, 20) {
            let Value::List(items) = value else {
                panic!("unexpected {}", value);
            };
            assert!(items.iter().all(|item| matches!(item, Value::Bool(_))));
        }
    }

    #[test]
    fn test_unconstrained_arguments_use_small_integers() {
        let repository = GeneratorRepository::with_builtins();
        let descriptor =
            TypeDescriptor::generic(names::LIST, vec![TypeDescriptor::wildcard()]);
        let generator = repository.generator_for(&descriptor).unwrap();
        for value in sample(generator.as_ref(), 4, 20) {
            for item in value.elements().unwrap() {
                assert!(matches!(item, Value::I32(v) if (-128..=127).contains(v)));
            }
        }

        let raw = repository
            .generator_for(&TypeDescriptor::named(names::SET))
            .unwrap();
        assert_eq!(raw.types(), vec![names::SET]);
    }

    #[test]
    fn test_bounded_wildcard_resolves_to_its_bound() {
        let repository = GeneratorRepository::with_builtins();
        let descriptor = TypeDescriptor::generic(
            names::OPTIONAL,
            vec![TypeDescriptor::extends(TypeDescriptor::named(names::STRING))],
        );
        let generator = repository.generator_for(&descriptor).unwrap();
        for value in sample(generator.as_ref(), 5, 20) {
            if let Value::Optional(Some(inner)) = value {
                assert!(matches!(*inner, Value::Str(_)));
            }
        }
    }

    #[test]
    fn test_argument_count_mismatch() {
        let repository = GeneratorRepository::with_builtins();
        let descriptor = TypeDescriptor::generic(
            names::MAP,
            vec![TypeDescriptor::named(names::I32)],
        );
        assert!(matches!(
            repository.generator_for(&descriptor),
            Err(GenerationError::ComponentArityMismatch {
                needed: 2,
                supplied: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_arrays_and_enumerations() {
        let repository = GeneratorRepository::with_builtins();
        let generator = repository
            .generator_for(
                &TypeDescriptor::array(TypeDescriptor::enumeration(
                    "suit",
                    ["hearts", "spades"],
                ))
                .with_directive(Directive::size(3, 3)),
            )
            .unwrap();
        for value in sample(generator.as_ref(), 6, 10) {
            let Value::Array(items) = value else {
                panic!("unexpected {}", value);
            };
            assert_eq!(items.len(), 3);
            assert!(items.iter().all(|item| matches!(item, Value::Enum { .. })));
        }
    }

    #[test]
    fn test_directives_are_applied() {
        let repository = GeneratorRepository::with_builtins();
        let descriptor = TypeDescriptor::named(names::I64)
            .with_directive(Directive::in_range(-4, 5))
            .with_directive(Directive::NullProbability(0.5));
        let generator = repository.generator_for(&descriptor).unwrap();
        let values = sample(generator.as_ref(), 7, 200);
        assert!(values.iter().any(Value::is_null));
        assert!(values
            .iter()
            .filter_map(Value::as_i64)
            .all(|v| (-4..=5).contains(&v)));

        let inverted = TypeDescriptor::named(names::I64).with_directive(Directive::in_range(5, -4));
        assert!(matches!(
            repository.generator_for(&inverted),
            Err(GenerationError::IllegalRange { .. })
        ));
    }

    #[test]
    fn test_only_values_replace_the_generator() {
        let repository = GeneratorRepository::with_builtins();
        let descriptor = TypeDescriptor::named(names::STRING).with_directive(
            Directive::OnlyValues(vec![Value::Str("a".into()), Value::Str("b".into())]),
        );
        let generator = repository.generator_for(&descriptor).unwrap();
        assert_eq!(generator.domain().map(|d| d.len()), Some(2));
    }

    #[test]
    fn test_user_types_resolve_through_declared_supertypes() {
        #[derive(Clone)]
        struct PointGenerator;

        impl Generator for PointGenerator {
            fn types(&self) -> Vec<String> {
                vec!["point".to_string()]
            }

            fn generate(
                &self,
                random: &mut SourceOfRandomness,
                _context: &mut GenerationContext,
            ) -> Result<Value, GenerationError> {
                Ok(Value::Struct {
                    name: "point".to_string(),
                    fields: vec![
                        ("x".to_string(), Value::I32(random.next_int_in(-9, 9)?)),
                        ("y".to_string(), Value::I32(random.next_int_in(-9, 9)?)),
                    ],
                })
            }

            fn can_shrink(&self, value: &Value) -> bool {
                matches!(value, Value::Struct { name, .. } if name == "point")
            }

            fn copy(&self) -> Box<dyn Generator> {
                Box::new(self.clone())
            }
        }

        let mut repository = GeneratorRepository::with_builtins();
        repository
            .declare_type("shape", &[names::ANY])
            .declare_type("point", &["shape"])
            .register(PointGenerator);
        let generator = repository
            .generator_for(&TypeDescriptor::named("shape"))
            .unwrap();
        assert!(sample(generator.as_ref(), 8, 10)
            .iter()
            .all(|v| matches!(v, Value::Struct { .. })));
    }

    #[test]
    fn test_concurrent_resolution() {
        let repository = GeneratorRepository::with_builtins();
        let descriptor = TypeDescriptor::generic(
            names::MAP,
            vec![
                TypeDescriptor::named(names::I32),
                TypeDescriptor::named(names::STRING),
            ],
        );
        crossbeam::scope(|scope| {
            for seed in 0..4 {
                let repository = &repository;
                let descriptor = &descriptor;
                scope.spawn(move |_| {
                    let generator = repository.generator_for(descriptor).unwrap();
                    for value in sample(generator.as_ref(), seed, 10) {
                        assert!(matches!(value, Value::Map(_)));
                    }
                });
            }
        })
        .unwrap();
    }
}
