//! Type-directed resolution through the public repository API

use bigdecimal::BigDecimal;
use quiver::{
    Directive, GenerationContext, GenerationError, GeneratorRepository, SourceOfRandomness, TypeDescriptor,
    TypeHierarchy, Value, names,
};

#[test]
fn test_resolved_generators_are_assignable_to_the_request() {
    let repository = GeneratorRepository::with_builtins();
    for requested in [
        names::ANY,
        names::NUMBER,
        names::COMPARABLE,
        names::CHAR_SEQUENCE,
        names::COLLECTION,
        names::ITERABLE,
    ] {
        let generator = repository
            .generator_for(&TypeDescriptor::named(requested))
            .unwrap();
        for declared in generator.types() {
            assert!(
                repository.hierarchy().is_assignable(&declared, requested),
                "{} offered for {}",
                declared,
                requested
            );
        }
    }
}

#[test]
fn test_comparable_produces_only_comparable_values() {
    let repository = GeneratorRepository::with_builtins();
    let generator = repository
        .generator_for(&TypeDescriptor::named(names::COMPARABLE))
        .unwrap();
    let mut random = SourceOfRandomness::new(6);
    let mut context = GenerationContext::new(5);
    for _ in 0..300 {
        let value = generator.generate(&mut random, &mut context).unwrap();
        assert!(
            !matches!(
                value,
                Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Optional(_)
            ),
            "unexpected {}",
            value
        );
    }
}

#[test]
fn test_nested_generic_resolution() {
    let repository = GeneratorRepository::with_builtins();
    let descriptor = TypeDescriptor::generic(
        names::MAP,
        vec![
            TypeDescriptor::named(names::STRING),
            TypeDescriptor::array(TypeDescriptor::generic(
                names::OPTIONAL,
                vec![TypeDescriptor::named(names::DECIMAL)],
            )),
        ],
    );
    assert_eq!(descriptor.to_string(), "map<string, optional<decimal>[]>");

    let generator = repository.generator_for(&descriptor).unwrap();
    let mut random = SourceOfRandomness::new(10);
    let mut context = GenerationContext::new(4);
    for _ in 0..20 {
        let Value::Map(entries) = generator.generate(&mut random, &mut context).unwrap() else {
            panic!("expected a map");
        };
        for (key, value) in entries {
            assert!(matches!(key, Value::Str(_)));
            for element in value.elements().unwrap() {
                assert!(matches!(
                    element,
                    Value::Optional(None) | Value::Optional(Some(_))
                ));
            }
        }
    }
}

#[test]
fn test_empty_hierarchy_resolves_nothing() {
    let repository = GeneratorRepository::new(TypeHierarchy::new());
    assert_eq!(
        repository
            .generator_for(&TypeDescriptor::generic(
                names::LIST,
                vec![TypeDescriptor::named(names::I32)],
            ))
            .err(),
        Some(GenerationError::UnresolvedType("list<i32>".to_string()))
    );
}

#[test]
fn test_unresolved_type_arguments_are_reported() {
    let repository = GeneratorRepository::with_builtins();
    let error = repository
        .generator_for(&TypeDescriptor::generic(
            names::LIST,
            vec![TypeDescriptor::named("gadget")],
        ))
        .err();
    assert_eq!(error, Some(GenerationError::UnresolvedType("gadget".to_string())));
}

#[test]
fn test_resolutions_are_independent_copies() {
    let repository = GeneratorRepository::with_builtins();
    let narrow = repository
        .generator_for(
            &TypeDescriptor::named(names::I32).with_directive(Directive::in_range(0, 1)),
        )
        .unwrap();
    let wide = repository
        .generator_for(&TypeDescriptor::named(names::I32))
        .unwrap();

    let mut random = SourceOfRandomness::new(3);
    let mut context = GenerationContext::new(5);
    let wide_values: Vec<i64> = (0..200)
        .map(|_| wide.generate(&mut random, &mut context).unwrap().as_i64().unwrap())
        .collect();
    assert!(wide_values.iter().any(|v| !(0..=1).contains(v)));
    for _ in 0..50 {
        let v = narrow
            .generate(&mut random, &mut context)
            .unwrap()
            .as_i64()
            .unwrap();
        assert!((0..=1).contains(&v));
    }
}

#[test]
fn test_partial_ranges_combine_in_either_order() {
    let repository = GeneratorRepository::with_builtins();
    for [first, second] in [
        [Directive::at_least(10), Directive::at_most(20)],
        [Directive::at_most(20), Directive::at_least(10)],
    ] {
        let generator = repository
            .generator_for(
                &TypeDescriptor::named(names::I32)
                    .with_directive(first)
                    .with_directive(second),
            )
            .unwrap();
        let mut random = SourceOfRandomness::new(12);
        let mut context = GenerationContext::new(1_000);
        for _ in 0..300 {
            let v = generator
                .generate(&mut random, &mut context)
                .unwrap()
                .as_i64()
                .unwrap();
            assert!((10..=20).contains(&v), "{}", v);
        }
    }
}

#[test]
fn test_partial_decimal_ranges_combine_in_either_order() {
    let repository = GeneratorRepository::with_builtins();
    let low = BigDecimal::from(-3);
    let high = BigDecimal::from(4);
    for [first, second] in [
        [Directive::at_least(-3), Directive::at_most(4)],
        [Directive::at_most(4), Directive::at_least(-3)],
    ] {
        let generator = repository
            .generator_for(
                &TypeDescriptor::named(names::DECIMAL)
                    .with_directive(first)
                    .with_directive(second),
            )
            .unwrap();
        let mut random = SourceOfRandomness::new(13);
        let mut context = GenerationContext::new(1_000);
        for _ in 0..300 {
            let Value::Decimal(v) = generator.generate(&mut random, &mut context).unwrap() else {
                panic!("expected a decimal");
            };
            assert!(v >= low && v <= high, "{}", v);
        }
    }
}
