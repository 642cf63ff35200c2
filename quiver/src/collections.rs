//! Componentized generators: lists, sets, arrays, maps, optionals, tuples and functions.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_traits::Zero;

use crate::config::Directive;
use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::generator::{Components, Generator, GeneratorShape};
use crate::rng::SourceOfRandomness;
use crate::types::names;
use crate::value::{GeneratedFunction, Value};

/// Largest cartesian product a tuple reports as its finite domain
const MAX_TUPLE_DOMAIN: usize = 10_000;

/// Copies of `items` with chunks removed, largest chunks first.
///
/// Chunk sizes start at `items.len() - min_len` and halve down to one, and
/// each chunk size is tried at every aligned offset. No copy is shorter than
/// `min_len`.
pub fn removal_candidates<T: Clone>(items: &[T], min_len: usize) -> Vec<Vec<T>> {
    let len = items.len();
    let mut candidates = Vec::new();
    if len <= min_len {
        return candidates;
    }
    let mut chunk = len - min_len;
    while chunk > 0 {
        let mut start = 0;
        while start + chunk <= len {
            let mut shorter = items[..start].to_vec();
            shorter.extend_from_slice(&items[start + chunk..]);
            candidates.push(shorter);
            start += chunk;
        }
        chunk /= 2;
    }
    candidates
}

fn choose_length(
    size: Option<(usize, usize)>,
    random: &mut SourceOfRandomness,
    context: &GenerationContext,
) -> Result<usize, GenerationError> {
    match size {
        Some((min, max)) => Ok(random.next_unsigned_in(min as u64, max as u64)? as usize),
        None => Ok(context.size()),
    }
}

fn validate_size(min: usize, max: usize) -> Result<(usize, usize), GenerationError> {
    if min > max {
        return Err(GenerationError::illegal_range(min, max));
    }
    Ok((min, max))
}

/// Sequence shapes sharing one element component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    /// Distinct elements
    Set,
    Array,
}

impl CollectionKind {
    fn type_name(self) -> &'static str {
        match self {
            CollectionKind::List => names::LIST,
            CollectionKind::Set => names::SET,
            CollectionKind::Array => names::ARRAY,
        }
    }

    fn wrap(self, items: Vec<Value>) -> Value {
        match self {
            CollectionKind::List => Value::List(items),
            CollectionKind::Set => Value::Set(items),
            CollectionKind::Array => Value::Array(items),
        }
    }

    fn items(self, value: &Value) -> Option<&[Value]> {
        match (self, value) {
            (CollectionKind::List, Value::List(items))
            | (CollectionKind::Set, Value::Set(items))
            | (CollectionKind::Array, Value::Array(items)) => Some(items),
            _ => None,
        }
    }
}

/// Generator for lists, sets and arrays of one element type.
///
/// The length is the trial's size unless a `Size` directive bounds it. Sets
/// drop duplicate draws, so a set may come out shorter than requested when the
/// element domain is small.
#[derive(Clone)]
pub struct CollectionGenerator {
    kind: CollectionKind,
    size: Option<(usize, usize)>,
    components: Components,
}

impl CollectionGenerator {
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            size: None,
            components: Components::new(1),
        }
    }

    pub fn list() -> Self {
        Self::new(CollectionKind::List)
    }

    pub fn set() -> Self {
        Self::new(CollectionKind::Set)
    }

    pub fn array() -> Self {
        Self::new(CollectionKind::Array)
    }

    /// A ready generator with `element` already installed
    pub fn of(kind: CollectionKind, element: Box<dyn Generator>) -> Result<Self, GenerationError> {
        let mut generator = Self::new(kind);
        generator.add_components(vec![element])?;
        Ok(generator)
    }

    pub fn with_size(mut self, min: usize, max: usize) -> Result<Self, GenerationError> {
        self.size = Some(validate_size(min, max)?);
        Ok(self)
    }

    fn min_size(&self) -> usize {
        self.size.map_or(0, |(min, _)| min)
    }
}

impl Generator for CollectionGenerator {
    fn types(&self) -> Vec<String> {
        vec![self.kind.type_name().to_string()]
    }

    fn shape(&self) -> GeneratorShape {
        GeneratorShape::Container
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let element = self.components.get(self.kind.type_name(), 0)?;
        let length = choose_length(self.size, random, context)?;
        let mut items = Vec::with_capacity(length);

        if self.kind == CollectionKind::Set {
            let mut attempts = 0;
            while items.len() < length && attempts < length * 10 {
                let item = element.generate(random, context)?;
                if !items.contains(&item) {
                    items.push(item);
                }
                attempts += 1;
            }
        } else {
            for _ in 0..length {
                items.push(element.generate(random, context)?);
            }
        }

        Ok(self.kind.wrap(items))
    }

    fn shrink(&self, random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Some(items) = self.kind.items(value) else {
            return Box::new(std::iter::empty());
        };
        let kind = self.kind;
        let mut candidates: Vec<Value> = removal_candidates(items, self.min_size())
            .into_iter()
            .map(|shorter| kind.wrap(shorter))
            .collect();

        if let Ok(element) = self.components.get(kind.type_name(), 0) {
            for (index, item) in items.iter().enumerate() {
                for simpler in element.shrink(random, item) {
                    if kind == CollectionKind::Set && items.contains(&simpler) {
                        continue;
                    }
                    let mut replaced = items.to_vec();
                    replaced[index] = simpler;
                    candidates.push(kind.wrap(replaced));
                }
            }
        }

        Box::new(candidates.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        self.kind.items(value).is_some()
    }

    /// Length plus the magnitudes of the elements
    fn magnitude(&self, value: &Value) -> BigDecimal {
        let Some(items) = self.kind.items(value) else {
            return BigDecimal::zero();
        };
        let mut total = BigDecimal::from(items.len() as u64);
        if let Ok(element) = self.components.get(self.kind.type_name(), 0) {
            for item in items {
                total += element.magnitude(item);
            }
        }
        total
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        match directive {
            Directive::Size { min, max } => {
                self.size = Some(validate_size(*min, *max)?);
                Ok(())
            }
            other => Err(GenerationError::unsupported_directive(
                self.kind.type_name(),
                other,
            )),
        }
    }

    fn number_of_needed_components(&self) -> usize {
        self.components.needed()
    }

    fn add_components(&mut self, components: Vec<Box<dyn Generator>>) -> Result<(), GenerationError> {
        self.components.install(self.kind.type_name(), components)
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Generator for key to value maps.
///
/// Each of `size` draws generates a key and then a value; a duplicate key
/// overwrites the earlier entry, so the map may hold fewer than `size` entries.
#[derive(Clone)]
pub struct MapGenerator {
    size: Option<(usize, usize)>,
    components: Components,
}

impl Default for MapGenerator {
    fn default() -> Self {
        Self {
            size: None,
            components: Components::new(2),
        }
    }
}

impl MapGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(key: Box<dyn Generator>, value: Box<dyn Generator>) -> Result<Self, GenerationError> {
        let mut generator = Self::new();
        generator.add_components(vec![key, value])?;
        Ok(generator)
    }

    pub fn with_size(mut self, min: usize, max: usize) -> Result<Self, GenerationError> {
        self.size = Some(validate_size(min, max)?);
        Ok(self)
    }

    fn min_size(&self) -> usize {
        self.size.map_or(0, |(min, _)| min)
    }
}

impl Generator for MapGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::MAP.to_string()]
    }

    fn shape(&self) -> GeneratorShape {
        GeneratorShape::Container
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let keys = self.components.get(names::MAP, 0)?;
        let values = self.components.get(names::MAP, 1)?;
        let draws = choose_length(self.size, random, context)?;

        let mut entries = Vec::with_capacity(draws);
        for _ in 0..draws {
            let key = keys.generate(random, context)?;
            let value = values.generate(random, context)?;
            Value::insert_entry(&mut entries, key, value);
        }
        Ok(Value::Map(entries))
    }

    fn shrink(&self, random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Value::Map(entries) = value else {
            return Box::new(std::iter::empty());
        };
        let mut candidates: Vec<Value> = removal_candidates(entries, self.min_size())
            .into_iter()
            .map(Value::Map)
            .collect();

        if let (Ok(keys), Ok(values)) = (
            self.components.get(names::MAP, 0),
            self.components.get(names::MAP, 1),
        ) {
            for (index, (key, entry_value)) in entries.iter().enumerate() {
                for simpler in keys.shrink(random, key) {
                    if entries.iter().any(|(existing, _)| *existing == simpler) {
                        continue;
                    }
                    let mut replaced = entries.clone();
                    replaced[index].0 = simpler;
                    candidates.push(Value::Map(replaced));
                }
                for simpler in values.shrink(random, entry_value) {
                    let mut replaced = entries.clone();
                    replaced[index].1 = simpler;
                    candidates.push(Value::Map(replaced));
                }
            }
        }

        Box::new(candidates.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_))
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        let Value::Map(entries) = value else {
            return BigDecimal::zero();
        };
        let mut total = BigDecimal::from(entries.len() as u64);
        if let (Ok(keys), Ok(values)) = (
            self.components.get(names::MAP, 0),
            self.components.get(names::MAP, 1),
        ) {
            for (key, entry_value) in entries {
                total += keys.magnitude(key) + values.magnitude(entry_value);
            }
        }
        total
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        match directive {
            Directive::Size { min, max } => {
                self.size = Some(validate_size(*min, *max)?);
                Ok(())
            }
            other => Err(GenerationError::unsupported_directive(names::MAP, other)),
        }
    }

    fn number_of_needed_components(&self) -> usize {
        self.components.needed()
    }

    fn add_components(&mut self, components: Vec<Box<dyn Generator>>) -> Result<(), GenerationError> {
        self.components.install(names::MAP, components)
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Generator for optional values; about a quarter of them are empty
#[derive(Clone)]
pub struct OptionalGenerator {
    components: Components,
}

impl Default for OptionalGenerator {
    fn default() -> Self {
        Self {
            components: Components::new(1),
        }
    }
}

impl OptionalGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Generator for OptionalGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::OPTIONAL.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let inner = self.components.get(names::OPTIONAL, 0)?;
        if random.next_double() < 0.25 {
            return Ok(Value::Optional(None));
        }
        let value = inner.generate(random, context)?;
        Ok(Value::Optional(Some(Box::new(value))))
    }

    fn shrink(&self, random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Value::Optional(Some(present)) = value else {
            return Box::new(std::iter::empty());
        };
        let mut candidates = vec![Value::Optional(None)];
        if let Ok(inner) = self.components.get(names::OPTIONAL, 0) {
            candidates.extend(
                inner
                    .shrink(random, present)
                    .map(|simpler| Value::Optional(Some(Box::new(simpler)))),
            );
        }
        Box::new(candidates.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Optional(_))
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        match (value, self.components.get(names::OPTIONAL, 0)) {
            (Value::Optional(Some(present)), Ok(inner)) => {
                BigDecimal::from(1) + inner.magnitude(present)
            }
            (Value::Optional(Some(_)), Err(_)) => BigDecimal::from(1),
            _ => BigDecimal::zero(),
        }
    }

    fn number_of_needed_components(&self) -> usize {
        self.components.needed()
    }

    fn add_components(&mut self, components: Vec<Box<dyn Generator>>) -> Result<(), GenerationError> {
        self.components.install(names::OPTIONAL, components)
    }

    fn domain(&self) -> Option<Vec<Value>> {
        let inner = self.components.get(names::OPTIONAL, 0).ok()?;
        let mut domain = vec![Value::Optional(None)];
        domain.extend(
            inner
                .domain()?
                .into_iter()
                .map(|value| Value::Optional(Some(Box::new(value)))),
        );
        Some(domain)
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Generator for pairs and triples; each slot shrinks independently
#[derive(Clone)]
pub struct TupleGenerator {
    type_name: &'static str,
    components: Components,
}

impl TupleGenerator {
    pub fn pair() -> Self {
        Self {
            type_name: names::PAIR,
            components: Components::new(2),
        }
    }

    pub fn triple() -> Self {
        Self {
            type_name: names::TRIPLE,
            components: Components::new(3),
        }
    }

    fn slots<'a>(&self, value: &'a Value) -> Option<&'a [Value]> {
        match value {
            Value::Tuple(items) if items.len() == self.components.needed() => Some(items),
            _ => None,
        }
    }
}

impl Generator for TupleGenerator {
    fn types(&self) -> Vec<String> {
        vec![self.type_name.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let mut items = Vec::with_capacity(self.components.needed());
        for index in 0..self.components.needed() {
            let component = self.components.get(self.type_name, index)?;
            items.push(component.generate(random, context)?);
        }
        Ok(Value::Tuple(items))
    }

    fn shrink(&self, random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Some(items) = self.slots(value) else {
            return Box::new(std::iter::empty());
        };
        let mut candidates = Vec::new();
        for (index, component) in self.components.iter().enumerate() {
            for simpler in component.shrink(random, &items[index]) {
                let mut replaced = items.to_vec();
                replaced[index] = simpler;
                candidates.push(Value::Tuple(replaced));
            }
        }
        Box::new(candidates.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        self.slots(value).is_some()
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        let Some(items) = self.slots(value) else {
            return BigDecimal::zero();
        };
        self.components
            .iter()
            .zip(items)
            .fold(BigDecimal::zero(), |total, (component, item)| {
                total + component.magnitude(item)
            })
    }

    fn number_of_needed_components(&self) -> usize {
        self.components.needed()
    }

    fn add_components(&mut self, components: Vec<Box<dyn Generator>>) -> Result<(), GenerationError> {
        self.components.install(self.type_name, components)
    }

    /// Cartesian product of the component domains, when all are finite and small
    fn domain(&self) -> Option<Vec<Value>> {
        if !self.components.is_ready() {
            return None;
        }
        let mut product: Vec<Vec<Value>> = vec![Vec::new()];
        for component in self.components.iter() {
            let domain = component.domain()?;
            if product.len().saturating_mul(domain.len()) > MAX_TUPLE_DOMAIN {
                return None;
            }
            product = product
                .into_iter()
                .flat_map(|prefix| {
                    domain.iter().map(move |value| {
                        let mut extended = prefix.clone();
                        extended.push(value.clone());
                        extended
                    })
                })
                .collect();
        }
        Some(product.into_iter().map(Value::Tuple).collect())
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Generator for pure functions of one argument.
///
/// Component 0 describes the argument type, component 1 the codomain. The
/// produced function is deterministic per argument and never shrinks.
#[derive(Clone)]
pub struct FunctionGenerator {
    components: Components,
}

impl Default for FunctionGenerator {
    fn default() -> Self {
        Self {
            components: Components::new(2),
        }
    }
}

impl FunctionGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Generator for FunctionGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::FUNCTION.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let codomain = self.components.get(names::FUNCTION, 1)?.copy();
        let seed = random.next_long();
        Ok(Value::Function(GeneratedFunction::new(
            seed,
            1,
            context.size(),
            Arc::from(codomain),
        )))
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Function(_))
    }

    fn number_of_needed_components(&self) -> usize {
        self.components.needed()
    }

    fn add_components(&mut self, components: Vec<Box<dyn Generator>>) -> Result<(), GenerationError> {
        self.components.install(names::FUNCTION, components)
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}
