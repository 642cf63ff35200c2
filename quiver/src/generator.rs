//! Core generator abstraction, component slots and the generic wrapper generators.

use bigdecimal::BigDecimal;
use num_traits::Zero;

use crate::config::Directive;
use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::rng::SourceOfRandomness;
use crate::value::Value;

/// Shape of the values a generator produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorShape {
    Scalar,
    /// Collection or map shaped; never offered for the universal type
    Container,
}

/// Core generator trait for creating random values and their shrink candidates.
///
/// Generators are repository templates: resolution hands out a [`copy`] so
/// configuration and injected components are never shared between trials.
///
/// [`copy`]: Generator::copy
pub trait Generator: Send + Sync {
    /// Raw type names this generator produces values for
    fn types(&self) -> Vec<String>;

    fn shape(&self) -> GeneratorShape {
        GeneratorShape::Scalar
    }

    /// Generate a value from the draws of `random` and the state of `context`
    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError>;

    /// Candidates no larger than `value` by [`magnitude`](Generator::magnitude), never `value` itself
    fn shrink(&self, random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let _ = (random, value);
        Box::new(std::iter::empty())
    }

    /// Whether `value` has the shape this generator produces
    fn can_shrink(&self, value: &Value) -> bool;

    fn magnitude(&self, value: &Value) -> BigDecimal {
        let _ = value;
        BigDecimal::zero()
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        Err(GenerationError::unsupported_directive(
            self.types().join("|"),
            directive,
        ))
    }

    fn number_of_needed_components(&self) -> usize {
        0
    }

    fn add_components(&mut self, components: Vec<Box<dyn Generator>>) -> Result<(), GenerationError> {
        if components.is_empty() {
            Ok(())
        } else {
            Err(GenerationError::ComponentArityMismatch {
                generator: self.types().join("|"),
                needed: 0,
                supplied: components.len(),
            })
        }
    }

    /// Every value this generator can produce, when that set is small and finite
    fn domain(&self) -> Option<Vec<Value>> {
        None
    }

    /// An independent copy including configuration and components
    fn copy(&self) -> Box<dyn Generator>;
}

impl Clone for Box<dyn Generator> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

/// Component generator slots of a componentized generator
#[derive(Clone)]
pub struct Components {
    needed: usize,
    slots: Vec<Box<dyn Generator>>,
}

impl Components {
    pub fn new(needed: usize) -> Self {
        Self {
            needed,
            slots: Vec::new(),
        }
    }

    pub fn needed(&self) -> usize {
        self.needed
    }

    pub fn is_ready(&self) -> bool {
        self.slots.len() == self.needed
    }

    /// Install exactly `needed` components on behalf of `owner`
    pub fn install(
        &mut self,
        owner: &str,
        components: Vec<Box<dyn Generator>>,
    ) -> Result<(), GenerationError> {
        if components.len() != self.needed {
            return Err(GenerationError::ComponentArityMismatch {
                generator: owner.to_string(),
                needed: self.needed,
                supplied: components.len(),
            });
        }
        self.slots = components;
        Ok(())
    }

    /// The component in `index`, failing when components were never installed
    pub fn get(&self, owner: &str, index: usize) -> Result<&dyn Generator, GenerationError> {
        self.slots
            .get(index)
            .map(|component| component.as_ref())
            .ok_or_else(|| GenerationError::ComponentArityMismatch {
                generator: owner.to_string(),
                needed: self.needed,
                supplied: self.slots.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Generator> {
        self.slots.iter().map(|component| component.as_ref())
    }
}

/// Chooses uniformly among several generators matching one type
#[derive(Clone)]
pub struct CompositeGenerator {
    members: Vec<Box<dyn Generator>>,
}

impl CompositeGenerator {
    pub fn new(members: Vec<Box<dyn Generator>>) -> Result<Self, GenerationError> {
        if members.is_empty() {
            return Err(GenerationError::EmptyChoice);
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> usize {
        self.members.len()
    }

    fn capable(&self, value: &Value) -> Vec<&dyn Generator> {
        self.members
            .iter()
            .map(|member| member.as_ref())
            .filter(|member| member.can_shrink(value))
            .collect()
    }
}

impl Generator for CompositeGenerator {
    fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for member in &self.members {
            for name in member.types() {
                if !types.contains(&name) {
                    types.push(name);
                }
            }
        }
        types
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let member = random.choose(&self.members)?;
        member.generate(random, context)
    }

    fn shrink(&self, random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let capable = self.capable(value);
        match random.choose(&capable) {
            Ok(member) => member.shrink(random, value),
            Err(_) => Box::new(std::iter::empty()),
        }
    }

    fn can_shrink(&self, value: &Value) -> bool {
        self.members.iter().any(|member| member.can_shrink(value))
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        self.capable(value)
            .first()
            .map_or_else(BigDecimal::zero, |member| member.magnitude(value))
    }

    /// Keeps only the members that accept the directive.
    ///
    /// When no member accepts it, the most specific rejection is returned: a
    /// range or value error wins over an unsupported directive.
    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        let mut accepted = Vec::new();
        let mut rejection: Option<GenerationError> = None;
        for mut member in std::mem::take(&mut self.members) {
            match member.configure(directive) {
                Ok(()) => accepted.push(member),
                Err(error) => {
                    let unsupported = matches!(error, GenerationError::UnsupportedDirective { .. });
                    if rejection.is_none() || !unsupported {
                        rejection = Some(error);
                    }
                }
            }
        }
        if accepted.is_empty() {
            return Err(rejection
                .unwrap_or_else(|| GenerationError::unsupported_directive("composite", directive)));
        }
        self.members = accepted;
        Ok(())
    }

    fn domain(&self) -> Option<Vec<Value>> {
        let mut domain = Vec::new();
        for member in &self.members {
            for value in member.domain()? {
                if !domain.contains(&value) {
                    domain.push(value);
                }
            }
        }
        Some(domain)
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Produces `Value::Null` with a fixed probability, otherwise delegates
#[derive(Clone)]
pub struct NullableGenerator {
    inner: Box<dyn Generator>,
    probability: f64,
}

impl NullableGenerator {
    pub fn new(inner: Box<dyn Generator>, probability: f64) -> Result<Self, GenerationError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(GenerationError::invalid_directive(
                Directive::NullProbability(probability),
                "probability must be within [0, 1]",
            ));
        }
        Ok(Self { inner, probability })
    }
}

impl Generator for NullableGenerator {
    fn types(&self) -> Vec<String> {
        self.inner.types()
    }

    fn shape(&self) -> GeneratorShape {
        self.inner.shape()
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        if random.next_double() < self.probability {
            return Ok(Value::Null);
        }
        self.inner.generate(random, context)
    }

    fn shrink(&self, random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        if value.is_null() {
            return Box::new(std::iter::empty());
        }
        Box::new(std::iter::once(Value::Null).chain(self.inner.shrink(random, value)))
    }

    fn can_shrink(&self, value: &Value) -> bool {
        value.is_null() || self.inner.can_shrink(value)
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        if value.is_null() {
            BigDecimal::zero()
        } else {
            self.inner.magnitude(value)
        }
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        self.inner.configure(directive)
    }

    fn domain(&self) -> Option<Vec<Value>> {
        let mut domain = vec![Value::Null];
        domain.extend(self.inner.domain()?);
        Some(domain)
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Chooses among an explicit list of values; earlier entries count as simpler
#[derive(Debug, Clone)]
pub struct FixedValuesGenerator {
    type_name: String,
    values: Vec<Value>,
}

impl FixedValuesGenerator {
    pub fn new(type_name: impl Into<String>, values: Vec<Value>) -> Result<Self, GenerationError> {
        if values.is_empty() {
            return Err(GenerationError::invalid_directive(
                Directive::OnlyValues(values),
                "at least one value is required",
            ));
        }
        Ok(Self {
            type_name: type_name.into(),
            values,
        })
    }

    fn position(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|candidate| candidate == value)
    }
}

impl Generator for FixedValuesGenerator {
    fn types(&self) -> Vec<String> {
        vec![self.type_name.clone()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        _context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        random.choose(&self.values).cloned()
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let earlier = self.position(value).unwrap_or(0);
        Box::new(self.values[..earlier].to_vec().into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        self.position(value).is_some()
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        BigDecimal::from(self.position(value).unwrap_or(0) as u64)
    }

    fn domain(&self) -> Option<Vec<Value>> {
        Some(self.values.clone())
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> FixedValuesGenerator {
        FixedValuesGenerator::new(
            "letter",
            vec![
                Value::Char('a'),
                Value::Char('b'),
                Value::Char('c'),
            ],
        )
        .unwrap()
    }

    fn numbers() -> FixedValuesGenerator {
        FixedValuesGenerator::new("number", vec![Value::I32(1), Value::I32(2)]).unwrap()
    }

    #[test]
    fn test_fixed_values_generator() {
        let generator = letters();
        let mut random = SourceOfRandomness::new(1);
        let mut context = GenerationContext::new(5);
        for _ in 0..20 {
            let value = generator.generate(&mut random, &mut context).unwrap();
            assert!(generator.can_shrink(&value));
        }

        let shrinks: Vec<Value> = generator.shrink(&mut random, &Value::Char('c')).collect();
        assert_eq!(shrinks, vec![Value::Char('a'), Value::Char('b')]);
        assert_eq!(generator.shrink(&mut random, &Value::Char('a')).count(), 0);
        assert_eq!(generator.magnitude(&Value::Char('c')), BigDecimal::from(2));
    }

    #[test]
    fn test_fixed_values_requires_values() {
        assert!(matches!(
            FixedValuesGenerator::new("empty", vec![]),
            Err(GenerationError::InvalidDirective { .. })
        ));
    }

    #[test]
    fn test_composite_chooses_among_members() {
        let composite =
            CompositeGenerator::new(vec![Box::new(letters()), Box::new(numbers())]).unwrap();
        let mut random = SourceOfRandomness::new(2);
        let mut context = GenerationContext::new(5);
        let mut saw_letter = false;
        let mut saw_number = false;
        for _ in 0..100 {
            match composite.generate(&mut random, &mut context).unwrap() {
                Value::Char(_) => saw_letter = true,
                Value::I32(_) => saw_number = true,
                other => panic!("unexpected value {}", other),
            }
        }
        assert!(saw_letter && saw_number);
        assert_eq!(composite.types(), vec!["letter", "number"]);
    }

    #[test]
    fn test_composite_shrinks_with_a_capable_member() {
        let composite =
            CompositeGenerator::new(vec![Box::new(letters()), Box::new(numbers())]).unwrap();
        let mut random = SourceOfRandomness::new(3);
        let shrinks: Vec<Value> = composite.shrink(&mut random, &Value::I32(2)).collect();
        assert_eq!(shrinks, vec![Value::I32(1)]);
        assert!(!composite.can_shrink(&Value::Bool(true)));
        assert_eq!(composite.shrink(&mut random, &Value::Bool(true)).count(), 0);
    }

    #[test]
    fn test_composite_configure_fails_when_no_member_accepts() {
        let mut composite =
            CompositeGenerator::new(vec![Box::new(letters()), Box::new(numbers())]).unwrap();
        assert!(matches!(
            composite.configure(&Directive::size(1, 2)),
            Err(GenerationError::UnsupportedDirective { .. })
        ));
    }

    #[test]
    fn test_nullable_generator() {
        let generator = NullableGenerator::new(Box::new(numbers()), 0.5).unwrap();
        let mut random = SourceOfRandomness::new(4);
        let mut context = GenerationContext::new(5);
        let values: Vec<Value> = (0..200)
            .map(|_| generator.generate(&mut random, &mut context).unwrap())
            .collect();
        assert!(values.iter().any(Value::is_null));
        assert!(values.iter().any(|value| !value.is_null()));

        let shrinks: Vec<Value> = generator.shrink(&mut random, &Value::I32(2)).collect();
        assert_eq!(shrinks, vec![Value::Null, Value::I32(1)]);
        assert_eq!(generator.shrink(&mut random, &Value::Null).count(), 0);
        assert_eq!(
            generator.domain(),
            Some(vec![Value::Null, Value::I32(1), Value::I32(2)])
        );
    }

    #[test]
    fn test_nullable_probability_is_validated() {
        assert!(NullableGenerator::new(Box::new(numbers()), 1.5).is_err());
    }

    #[test]
    fn test_components_enforce_arity() {
        let mut components = Components::new(2);
        assert!(!components.is_ready());
        assert!(matches!(
            components.get("map", 0),
            Err(GenerationError::ComponentArityMismatch { supplied: 0, .. })
        ));
        assert!(matches!(
            components.install("map", vec![Box::new(numbers())]),
            Err(GenerationError::ComponentArityMismatch {
                needed: 2,
                supplied: 1,
                ..
            })
        ));
        components
            .install("map", vec![Box::new(numbers()), Box::new(letters())])
            .unwrap();
        assert!(components.is_ready());
        assert_eq!(components.get("map", 1).unwrap().types(), vec!["letter"]);
    }
}
