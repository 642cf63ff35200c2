//! Generators for booleans, characters, strings, enumerations and time values.

use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeDelta, Utc};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use rand::Rng;

use crate::collections::removal_candidates;
use crate::config::Directive;
use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::generator::Generator;
use crate::numeric::{integral_shrinks, least_magnitude, parse_bound};
use crate::range::{
    choose_duration, choose_instant, duration_to_nanos, instant_to_nanos, nanos_to_duration,
    nanos_to_instant,
};
use crate::rng::SourceOfRandomness;
use crate::types::names;
use crate::value::Value;

/// Generator for boolean values
#[derive(Debug, Clone, Default)]
pub struct BoolGenerator;

impl Generator for BoolGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::BOOL.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        _context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        Ok(Value::Bool(random.next_bool()))
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        if matches!(value, Value::Bool(true)) {
            Box::new(std::iter::once(Value::Bool(false)))
        } else {
            Box::new(std::iter::empty())
        }
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        match value {
            Value::Bool(true) => BigDecimal::from(1),
            _ => BigDecimal::zero(),
        }
    }

    fn domain(&self) -> Option<Vec<Value>> {
        Some(vec![Value::Bool(false), Value::Bool(true)])
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

fn parse_char(directive: &Directive, text: &str) -> Result<char, GenerationError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(GenerationError::invalid_directive(
            directive,
            format!("'{}' is not a single character", text),
        )),
    }
}

/// Generator for characters in a code-point range, `[U+0000, U+FFFF]` by default.
///
/// Surrogate code points are never produced. Shrinking moves toward the
/// lowest code point of the range.
#[derive(Debug, Clone)]
pub struct CharGenerator {
    min: char,
    max: char,
}

impl Default for CharGenerator {
    fn default() -> Self {
        Self {
            min: '\u{0}',
            max: '\u{FFFF}',
        }
    }
}

impl CharGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_range(min: char, max: char) -> Result<Self, GenerationError> {
        if min > max {
            return Err(GenerationError::illegal_range(min as u32, max as u32));
        }
        Ok(Self { min, max })
    }

    /// Printable ASCII, `' '` through `'~'`
    pub fn ascii_printable() -> Self {
        Self { min: ' ', max: '~' }
    }

    fn bounds(&self) -> (BigInt, BigInt) {
        (BigInt::from(self.min as u32), BigInt::from(self.max as u32))
    }

    fn shrink_char(&self, c: char) -> Vec<char> {
        let (min, max) = self.bounds();
        integral_shrinks(&BigInt::from(c as u32), Some(&min), Some(&max))
            .into_iter()
            .filter_map(|code| code.to_u32().and_then(char::from_u32))
            .collect()
    }

    fn char_magnitude(&self, c: char) -> u64 {
        u64::from(c as u32).saturating_sub(u64::from(self.min as u32))
    }

    fn configure_range(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        let Directive::InRange { min, max } = directive else {
            return Err(GenerationError::unsupported_directive(names::CHAR, directive));
        };
        let min = match min.as_deref() {
            Some(text) => parse_char(directive, text)?,
            None => self.min,
        };
        let max = match max.as_deref() {
            Some(text) => parse_char(directive, text)?,
            None => self.max,
        };
        *self = Self::in_range(min, max)?;
        Ok(())
    }
}

impl Generator for CharGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::CHAR.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        _context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        random.next_char_in(self.min, self.max).map(Value::Char)
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        match value {
            Value::Char(c) => Box::new(self.shrink_char(*c).into_iter().map(Value::Char)),
            _ => Box::new(std::iter::empty()),
        }
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Char(_))
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        match value {
            Value::Char(c) => BigDecimal::from(self.char_magnitude(*c)),
            _ => BigDecimal::zero(),
        }
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        self.configure_range(directive)
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Longest run a `*`, `+` or open `{n,}` repetition expands to
const MAX_PATTERN_REPEAT: u32 = 16;

/// A regular expression strings are sampled from and shrunk within
#[derive(Debug, Clone)]
struct StringPattern {
    sampler: rand_regex::Regex,
    matcher: regex::Regex,
}

impl StringPattern {
    fn compile(directive: &Directive, pattern: &str) -> Result<Self, GenerationError> {
        let sampler = rand_regex::Regex::compile(pattern, MAX_PATTERN_REPEAT)
            .map_err(|error| GenerationError::invalid_directive(directive, error.to_string()))?;
        if !sampler.is_utf8() {
            return Err(GenerationError::invalid_directive(
                directive,
                "pattern can produce text that is not UTF-8",
            ));
        }
        let matcher = regex::Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|error| GenerationError::invalid_directive(directive, error.to_string()))?;
        Ok(Self { sampler, matcher })
    }
}

/// Generator for strings of printable ASCII characters.
///
/// The length is the trial's size unless a `Size` directive bounds it; an
/// `InRange` directive with single-character bounds changes the alphabet.
/// A `MatchingPattern` directive replaces both: values are sampled from the
/// regular expression and shrink candidates that stop matching it are dropped.
#[derive(Debug, Clone)]
pub struct StringGenerator {
    chars: CharGenerator,
    length: Option<(usize, usize)>,
    pattern: Option<StringPattern>,
}

impl Default for StringGenerator {
    fn default() -> Self {
        Self {
            chars: CharGenerator::ascii_printable(),
            length: None,
            pattern: None,
        }
    }
}

impl StringGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length(mut self, min: usize, max: usize) -> Result<Self, GenerationError> {
        if min > max {
            return Err(GenerationError::illegal_range(min, max));
        }
        self.length = Some((min, max));
        Ok(self)
    }

    fn min_length(&self) -> usize {
        self.length.map_or(0, |(min, _)| min)
    }
}

impl Generator for StringGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::STRING.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        if let Some(ref pattern) = self.pattern {
            let text: String = random.to_std_rng().sample(&pattern.sampler);
            return Ok(Value::Str(text));
        }
        let length = match self.length {
            Some((min, max)) => random.next_unsigned_in(min as u64, max as u64)? as usize,
            None => context.size(),
        };
        let mut text = String::with_capacity(length);
        for _ in 0..length {
            text.push(random.next_char_in(self.chars.min, self.chars.max)?);
        }
        Ok(Value::Str(text))
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Value::Str(text) = value else {
            return Box::new(std::iter::empty());
        };
        let chars: Vec<char> = text.chars().collect();
        let mut candidates: Vec<String> = Vec::new();

        for shorter in removal_candidates(&chars, self.min_length()) {
            let shorter: String = shorter.into_iter().collect();
            if !candidates.contains(&shorter) {
                candidates.push(shorter);
            }
        }
        for (index, &c) in chars.iter().enumerate() {
            for simpler in self.chars.shrink_char(c) {
                let mut replaced = chars.clone();
                replaced[index] = simpler;
                candidates.push(replaced.into_iter().collect());
            }
        }
        if let Some(ref pattern) = self.pattern {
            candidates.retain(|candidate| pattern.matcher.is_match(candidate));
        }

        Box::new(candidates.into_iter().map(Value::Str))
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Str(_))
    }

    /// Length plus the magnitude of every character
    fn magnitude(&self, value: &Value) -> BigDecimal {
        let Value::Str(text) = value else {
            return BigDecimal::zero();
        };
        let total: u64 = text.chars().map(|c| 1 + self.chars.char_magnitude(c)).sum();
        BigDecimal::from(total)
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        match directive {
            Directive::Size { min, max } => {
                *self = self.clone().with_length(*min, *max)?;
                Ok(())
            }
            Directive::InRange { .. } => self.chars.configure_range(directive),
            Directive::MatchingPattern(pattern) => {
                self.pattern = Some(StringPattern::compile(directive, pattern)?);
                Ok(())
            }
            other => Err(GenerationError::unsupported_directive(names::STRING, other)),
        }
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Samples uniformly over the variants of a closed enumeration
#[derive(Debug, Clone)]
pub struct EnumGenerator {
    type_name: String,
    variants: Vec<String>,
}

impl EnumGenerator {
    pub fn new(type_name: impl Into<String>, variants: Vec<String>) -> Result<Self, GenerationError> {
        let type_name = type_name.into();
        if variants.is_empty() {
            return Err(GenerationError::UnresolvedType(format!(
                "{} (enumeration without variants)",
                type_name
            )));
        }
        Ok(Self {
            type_name,
            variants,
        })
    }

    fn value_at(&self, ordinal: usize) -> Value {
        Value::Enum {
            type_name: self.type_name.clone(),
            variant: self.variants[ordinal].clone(),
            ordinal,
        }
    }

    fn ordinal_of(&self, value: &Value) -> Option<usize> {
        match value {
            Value::Enum {
                type_name, ordinal, ..
            } if *type_name == self.type_name && *ordinal < self.variants.len() => Some(*ordinal),
            _ => None,
        }
    }
}

impl Generator for EnumGenerator {
    fn types(&self) -> Vec<String> {
        vec![self.type_name.clone()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        _context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let last = self.variants.len() as u64 - 1;
        let ordinal = random.next_unsigned_in(0, last)? as usize;
        Ok(self.value_at(ordinal))
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let ordinal = self.ordinal_of(value).unwrap_or(0);
        let lower: Vec<Value> = (0..ordinal).map(|index| self.value_at(index)).collect();
        Box::new(lower.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        self.ordinal_of(value).is_some()
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        BigDecimal::from(self.ordinal_of(value).unwrap_or(0) as u64)
    }

    fn domain(&self) -> Option<Vec<Value>> {
        Some((0..self.variants.len()).map(|index| self.value_at(index)).collect())
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

fn shrink_nanos(value: &BigInt, min: &BigInt, max: &BigInt) -> Vec<BigInt> {
    integral_shrinks(value, Some(min), Some(max))
}

fn nanos_magnitude(value: &BigInt, min: &BigInt, max: &BigInt) -> BigDecimal {
    let least = least_magnitude(Some(min), Some(max));
    BigDecimal::new((value - least).abs(), 0)
}

/// Generator for UTC instants; shrinks toward the in-range instant nearest the epoch
#[derive(Debug, Clone)]
pub struct InstantGenerator {
    min: DateTime<Utc>,
    max: DateTime<Utc>,
}

impl Default for InstantGenerator {
    fn default() -> Self {
        Self {
            min: DateTime::<Utc>::MIN_UTC,
            max: DateTime::<Utc>::MAX_UTC,
        }
    }
}

impl InstantGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_range(min: DateTime<Utc>, max: DateTime<Utc>) -> Result<Self, GenerationError> {
        if min > max {
            return Err(GenerationError::illegal_range(min, max));
        }
        Ok(Self { min, max })
    }

    fn parse(directive: &Directive, text: &str) -> Result<DateTime<Utc>, GenerationError> {
        DateTime::parse_from_rfc3339(text.trim())
            .map(|instant| instant.with_timezone(&Utc))
            .map_err(|error| GenerationError::invalid_directive(directive, error.to_string()))
    }

    fn nanos_bounds(&self) -> (BigInt, BigInt) {
        (instant_to_nanos(&self.min), instant_to_nanos(&self.max))
    }
}

impl Generator for InstantGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::INSTANT.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        _context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        choose_instant(random, &self.min, &self.max).map(Value::Instant)
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Value::Instant(instant) = value else {
            return Box::new(std::iter::empty());
        };
        let (min, max) = self.nanos_bounds();
        let candidates: Vec<Value> = shrink_nanos(&instant_to_nanos(instant), &min, &max)
            .iter()
            .filter_map(nanos_to_instant)
            .map(Value::Instant)
            .collect();
        Box::new(candidates.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Instant(_))
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        let Value::Instant(instant) = value else {
            return BigDecimal::zero();
        };
        let (min, max) = self.nanos_bounds();
        nanos_magnitude(&instant_to_nanos(instant), &min, &max)
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        let Directive::InRange { min, max } = directive else {
            return Err(GenerationError::unsupported_directive(names::INSTANT, directive));
        };
        let min = match min.as_deref() {
            Some(text) => Self::parse(directive, text)?,
            None => self.min,
        };
        let max = match max.as_deref() {
            Some(text) => Self::parse(directive, text)?,
            None => self.max,
        };
        *self = Self::in_range(min, max)?;
        Ok(())
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Generator for signed durations; bounds are given in decimal seconds
#[derive(Debug, Clone)]
pub struct DurationGenerator {
    min: TimeDelta,
    max: TimeDelta,
}

impl Default for DurationGenerator {
    fn default() -> Self {
        Self {
            min: TimeDelta::min_value(),
            max: TimeDelta::max_value(),
        }
    }
}

impl DurationGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_range(min: TimeDelta, max: TimeDelta) -> Result<Self, GenerationError> {
        if min > max {
            return Err(GenerationError::illegal_range(min, max));
        }
        Ok(Self { min, max })
    }

    fn parse(directive: &Directive, text: &str) -> Result<TimeDelta, GenerationError> {
        let seconds: BigDecimal = parse_bound(directive, text)?;
        let (nanos, _) = (seconds * BigDecimal::from(1_000_000_000))
            .with_scale(0)
            .into_bigint_and_exponent();
        nanos_to_duration(&nanos)
            .ok_or_else(|| GenerationError::invalid_directive(directive, "duration out of range"))
    }

    fn nanos_bounds(&self) -> (BigInt, BigInt) {
        (duration_to_nanos(&self.min), duration_to_nanos(&self.max))
    }
}

impl Generator for DurationGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::DURATION.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        _context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        choose_duration(random, &self.min, &self.max).map(Value::Duration)
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Value::Duration(duration) = value else {
            return Box::new(std::iter::empty());
        };
        let (min, max) = self.nanos_bounds();
        let candidates: Vec<Value> = shrink_nanos(&duration_to_nanos(duration), &min, &max)
            .iter()
            .filter_map(nanos_to_duration)
            .map(Value::Duration)
            .collect();
        Box::new(candidates.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Duration(_))
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        let Value::Duration(duration) = value else {
            return BigDecimal::zero();
        };
        let (min, max) = self.nanos_bounds();
        nanos_magnitude(&duration_to_nanos(duration), &min, &max)
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        let Directive::InRange { min, max } = directive else {
            return Err(GenerationError::unsupported_directive(names::DURATION, directive));
        };
        let min = match min.as_deref() {
            Some(text) => Self::parse(directive, text)?,
            None => self.min,
        };
        let max = match max.as_deref() {
            Some(text) => Self::parse(directive, text)?,
            None => self.max,
        };
        *self = Self::in_range(min, max)?;
        Ok(())
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}
