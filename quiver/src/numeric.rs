//! Integral, decimal and floating-point generators and their shrink sequences.
//!
//! Every numeric shrink follows the same policy: a negative value proposes its
//! positive counterpart first, then the least-magnitude value of the range
//! (zero, or the in-range value nearest to zero), then up to
//! [`MAX_HALVING_CANDIDATES`] values that successively halve the distance
//! between the least-magnitude value and the current one. Candidates outside
//! the configured range are dropped and duplicates are removed.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Float, Signed, ToPrimitive, Zero};

use crate::config::Directive;
use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::generator::Generator;
use crate::range::{choose_big_decimal, choose_big_integer, random_bits, signed_random_bits};
use crate::rng::SourceOfRandomness;
use crate::types::names;
use crate::value::Value;

pub const MAX_HALVING_CANDIDATES: usize = 15;

/// Parse one bound of an `InRange` directive
pub(crate) fn parse_bound<T: FromStr>(
    directive: &Directive,
    text: &str,
) -> Result<T, GenerationError> {
    text.trim()
        .parse()
        .map_err(|_| GenerationError::invalid_directive(directive, format!("cannot parse bound '{}'", text)))
}

/// The in-range value nearest to zero
pub fn least_magnitude(min: Option<&BigInt>, max: Option<&BigInt>) -> BigInt {
    match (min, max) {
        (Some(min), _) if min.is_positive() => min.clone(),
        (_, Some(max)) if max.is_negative() => max.clone(),
        _ => BigInt::zero(),
    }
}

/// `value` moved toward `least` by `d/2, d/4, ...` of the distance `d` between them.
///
/// The last candidate is one step from `value`, so a search that keeps
/// accepting candidates converges on the exact boundary.
pub fn halving_sequence(value: &BigInt, least: &BigInt) -> Vec<BigInt> {
    let distance = (value - least).abs();
    let above = value > least;
    let mut candidates = Vec::new();
    let mut step: BigInt = &distance >> 1usize;
    while step.is_positive() && candidates.len() < MAX_HALVING_CANDIDATES {
        candidates.push(if above { value - &step } else { value + &step });
        step = step >> 1usize;
    }
    candidates
}

/// Shrink candidates for an integer in the optional closed range `[min, max]`
pub fn integral_shrinks(value: &BigInt, min: Option<&BigInt>, max: Option<&BigInt>) -> Vec<BigInt> {
    let least = least_magnitude(min, max);
    let mut proposals = Vec::new();
    if value.is_negative() {
        proposals.push(-value);
    }
    proposals.push(least.clone());
    proposals.extend(halving_sequence(value, &least));

    let mut candidates: Vec<BigInt> = Vec::new();
    for candidate in proposals {
        let in_range = min.is_none_or(|min| candidate >= *min) && max.is_none_or(|max| candidate <= *max);
        if in_range && candidate != *value && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Integral widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegralKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    /// Arbitrary precision
    Big,
}

impl IntegralKind {
    pub const ALL: [IntegralKind; 9] = [
        IntegralKind::I8,
        IntegralKind::I16,
        IntegralKind::I32,
        IntegralKind::I64,
        IntegralKind::U8,
        IntegralKind::U16,
        IntegralKind::U32,
        IntegralKind::U64,
        IntegralKind::Big,
    ];

    /// Registered type name of the kind
    pub fn type_name(self) -> &'static str {
        match self {
            IntegralKind::I8 => names::I8,
            IntegralKind::I16 => names::I16,
            IntegralKind::I32 => names::I32,
            IntegralKind::I64 => names::I64,
            IntegralKind::U8 => names::U8,
            IntegralKind::U16 => names::U16,
            IntegralKind::U32 => names::U32,
            IntegralKind::U64 => names::U64,
            IntegralKind::Big => names::BIGINT,
        }
    }

    /// Full range of a fixed-width kind
    pub fn bounds(self) -> Option<(BigInt, BigInt)> {
        let bounds = match self {
            IntegralKind::I8 => (BigInt::from(i8::MIN), BigInt::from(i8::MAX)),
            IntegralKind::I16 => (BigInt::from(i16::MIN), BigInt::from(i16::MAX)),
            IntegralKind::I32 => (BigInt::from(i32::MIN), BigInt::from(i32::MAX)),
            IntegralKind::I64 => (BigInt::from(i64::MIN), BigInt::from(i64::MAX)),
            IntegralKind::U8 => (BigInt::zero(), BigInt::from(u8::MAX)),
            IntegralKind::U16 => (BigInt::zero(), BigInt::from(u16::MAX)),
            IntegralKind::U32 => (BigInt::zero(), BigInt::from(u32::MAX)),
            IntegralKind::U64 => (BigInt::zero(), BigInt::from(u64::MAX)),
            IntegralKind::Big => return None,
        };
        Some(bounds)
    }

    /// Narrow `n` into a value of this kind, `None` when it does not fit
    pub fn to_value(self, n: &BigInt) -> Option<Value> {
        match self {
            IntegralKind::I8 => n.to_i8().map(Value::I8),
            IntegralKind::I16 => n.to_i16().map(Value::I16),
            IntegralKind::I32 => n.to_i32().map(Value::I32),
            IntegralKind::I64 => n.to_i64().map(Value::I64),
            IntegralKind::U8 => n.to_u8().map(Value::U8),
            IntegralKind::U16 => n.to_u16().map(Value::U16),
            IntegralKind::U32 => n.to_u32().map(Value::U32),
            IntegralKind::U64 => n.to_u64().map(Value::U64),
            IntegralKind::Big => Some(Value::BigInt(n.clone())),
        }
    }

    /// Widen a value of this kind, `None` for any other variant
    pub fn from_value(self, value: &Value) -> Option<BigInt> {
        match (self, value) {
            (IntegralKind::I8, Value::I8(v)) => Some(BigInt::from(*v)),
            (IntegralKind::I16, Value::I16(v)) => Some(BigInt::from(*v)),
            (IntegralKind::I32, Value::I32(v)) => Some(BigInt::from(*v)),
            (IntegralKind::I64, Value::I64(v)) => Some(BigInt::from(*v)),
            (IntegralKind::U8, Value::U8(v)) => Some(BigInt::from(*v)),
            (IntegralKind::U16, Value::U16(v)) => Some(BigInt::from(*v)),
            (IntegralKind::U32, Value::U32(v)) => Some(BigInt::from(*v)),
            (IntegralKind::U64, Value::U64(v)) => Some(BigInt::from(*v)),
            (IntegralKind::Big, Value::BigInt(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Generator for every integral width.
///
/// Fixed widths default to their full range. Unbounded big integers draw
/// `size + 1` random bits so magnitude grows with the trial's size.
#[derive(Debug, Clone)]
pub struct IntegralGenerator {
    kind: IntegralKind,
    min: Option<BigInt>,
    max: Option<BigInt>,
}

impl IntegralGenerator {
    pub fn new(kind: IntegralKind) -> Self {
        let (min, max) = match kind.bounds() {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        Self { kind, min, max }
    }

    /// A generator restricted to `[min, max]`
    pub fn in_range(
        kind: IntegralKind,
        min: impl Into<BigInt>,
        max: impl Into<BigInt>,
    ) -> Result<Self, GenerationError> {
        let mut generator = Self::new(kind);
        generator.set_range(Some(min.into()), Some(max.into()))?;
        Ok(generator)
    }

    /// Integral type this generator produces
    pub fn kind(&self) -> IntegralKind {
        self.kind
    }

    /// Configured lower bound, `None` when unbounded
    pub fn min(&self) -> Option<&BigInt> {
        self.min.as_ref()
    }

    /// Configured upper bound, `None` when unbounded
    pub fn max(&self) -> Option<&BigInt> {
        self.max.as_ref()
    }

    fn set_range(&mut self, min: Option<BigInt>, max: Option<BigInt>) -> Result<(), GenerationError> {
        let (type_min, type_max) = match self.kind.bounds() {
            Some((low, high)) => (Some(low), Some(high)),
            None => (None, None),
        };
        // An omitted bound keeps the one already configured
        let min = min.or_else(|| self.min.clone()).or_else(|| type_min.clone());
        let max = max.or_else(|| self.max.clone()).or_else(|| type_max.clone());

        for bound in min.iter().chain(max.iter()) {
            let below = type_min.as_ref().is_some_and(|low| bound < low);
            let above = type_max.as_ref().is_some_and(|high| bound > high);
            if below || above {
                return Err(GenerationError::invalid_directive(
                    Directive::InRange {
                        min: min.as_ref().map(ToString::to_string),
                        max: max.as_ref().map(ToString::to_string),
                    },
                    format!("bound {} does not fit {}", bound, self.kind.type_name()),
                ));
            }
        }
        if let (Some(low), Some(high)) = (&min, &max) {
            if low > high {
                return Err(GenerationError::illegal_range(low, high));
            }
        }
        self.min = min;
        self.max = max;
        Ok(())
    }
}

impl Generator for IntegralGenerator {
    fn types(&self) -> Vec<String> {
        vec![self.kind.type_name().to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let bits = context.size() as u64 + 1;
        let n = match (&self.min, &self.max) {
            (Some(min), Some(max)) => choose_big_integer(random, min, max)?,
            (Some(min), None) => min + BigInt::from(random_bits(random, bits)),
            (None, Some(max)) => max - BigInt::from(random_bits(random, bits)),
            (None, None) => signed_random_bits(random, bits),
        };
        self.kind
            .to_value(&n)
            .ok_or_else(|| GenerationError::illegal_range(&n, self.kind.type_name()))
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Some(n) = self.kind.from_value(value) else {
            return Box::new(std::iter::empty());
        };
        let kind = self.kind;
        let candidates = integral_shrinks(&n, self.min.as_ref(), self.max.as_ref());
        Box::new(
            candidates
                .into_iter()
                .filter_map(move |candidate| kind.to_value(&candidate)),
        )
    }

    fn can_shrink(&self, value: &Value) -> bool {
        self.kind.from_value(value).is_some()
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        let least = least_magnitude(self.min.as_ref(), self.max.as_ref());
        self.kind
            .from_value(value)
            .map_or_else(BigDecimal::zero, |n| BigDecimal::new((n - least).abs(), 0))
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        match directive {
            Directive::InRange { min, max } => {
                let min = min
                    .as_deref()
                    .map(|text| parse_bound::<BigInt>(directive, text))
                    .transpose()?;
                let max = max
                    .as_deref()
                    .map(|text| parse_bound::<BigInt>(directive, text))
                    .transpose()?;
                self.set_range(min, max)
            }
            other => Err(GenerationError::unsupported_directive(
                self.kind.type_name(),
                other,
            )),
        }
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Arbitrary-precision decimal generator.
///
/// Without bounds values are drawn from `±10^(size + 1)`, at the precision
/// directive's scale when one is given.
#[derive(Debug, Clone, Default)]
pub struct DecimalGenerator {
    min: Option<BigDecimal>,
    max: Option<BigDecimal>,
    precision: Option<u32>,
}

impl DecimalGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_range(min: BigDecimal, max: BigDecimal) -> Result<Self, GenerationError> {
        if min > max {
            return Err(GenerationError::illegal_range(&min, &max));
        }
        Ok(Self {
            min: Some(min),
            max: Some(max),
            precision: None,
        })
    }

    pub fn with_precision(mut self, scale: u32) -> Self {
        self.precision = Some(scale);
        self
    }

    fn least(&self) -> BigDecimal {
        match (&self.min, &self.max) {
            (Some(min), _) if min.is_positive() => min.clone(),
            (_, Some(max)) if max.is_negative() => max.clone(),
            _ => BigDecimal::zero(),
        }
    }

    fn in_range_value(&self, value: &BigDecimal) -> bool {
        self.min.as_ref().is_none_or(|min| value >= min)
            && self.max.as_ref().is_none_or(|max| value <= max)
    }
}

impl Generator for DecimalGenerator {
    fn types(&self) -> Vec<String> {
        vec![names::DECIMAL.to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let span = BigDecimal::new(BigInt::from(10).pow(context.size() as u32 + 1), 0);
        let (low, high) = match (&self.min, &self.max) {
            (Some(min), Some(max)) => (min.clone(), max.clone()),
            (Some(min), None) => (min.clone(), min + &span),
            (None, Some(max)) => (max - &span, max.clone()),
            (None, None) => (-span.clone(), span),
        };
        choose_big_decimal(random, &low, &high, self.precision).map(Value::Decimal)
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Value::Decimal(value) = value else {
            return Box::new(std::iter::empty());
        };
        let least = self.least();
        let mut proposals = Vec::new();
        if value.is_negative() {
            proposals.push(-value.clone());
        }
        proposals.push(least.clone());
        proposals.push(value.with_scale(0));

        let (_, value_scale) = value.as_bigint_and_exponent();
        let (_, least_scale) = least.as_bigint_and_exponent();
        let scale = value_scale.max(least_scale).max(0);
        let (scaled_value, _) = value.with_scale(scale).into_bigint_and_exponent();
        let (scaled_least, _) = least.with_scale(scale).into_bigint_and_exponent();
        proposals.extend(
            halving_sequence(&scaled_value, &scaled_least)
                .into_iter()
                .map(|n| BigDecimal::new(n, scale)),
        );

        let mut candidates: Vec<Value> = Vec::new();
        for proposal in proposals {
            if proposal != *value && self.in_range_value(&proposal) {
                let candidate = Value::Decimal(proposal);
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
        Box::new(candidates.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        matches!(value, Value::Decimal(_))
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        match value {
            Value::Decimal(value) => (value - self.least()).abs(),
            _ => BigDecimal::zero(),
        }
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        match directive {
            Directive::InRange { min, max } => {
                let min = min
                    .as_deref()
                    .map(|text| parse_bound::<BigDecimal>(directive, text))
                    .transpose()?;
                let max = max
                    .as_deref()
                    .map(|text| parse_bound::<BigDecimal>(directive, text))
                    .transpose()?;
                let min = min.or_else(|| self.min.clone());
                let max = max.or_else(|| self.max.clone());
                if let (Some(low), Some(high)) = (&min, &max) {
                    if low > high {
                        return Err(GenerationError::illegal_range(low, high));
                    }
                }
                self.min = min;
                self.max = max;
                Ok(())
            }
            Directive::Precision { scale } => {
                self.precision = Some(*scale);
                Ok(())
            }
            other => Err(GenerationError::unsupported_directive(names::DECIMAL, other)),
        }
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

/// Floating-point widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    F32,
    F64,
}

impl FloatKind {
    /// Registered type name of the kind
    pub fn type_name(self) -> &'static str {
        match self {
            FloatKind::F32 => names::F32,
            FloatKind::F64 => names::F64,
        }
    }

    fn to_value(self, value: f64) -> Value {
        match self {
            FloatKind::F32 => Value::F32(value as f32),
            FloatKind::F64 => Value::F64(value),
        }
    }

    fn from_value(self, value: &Value) -> Option<f64> {
        match (self, value) {
            (FloatKind::F32, Value::F32(v)) => Some(f64::from(*v)),
            (FloatKind::F64, Value::F64(v)) => Some(*v),
            _ => None,
        }
    }
}

/// The exact decimal value of a finite float
pub fn exact_decimal(value: f64) -> BigDecimal {
    if !value.is_finite() {
        return BigDecimal::zero();
    }
    let (mantissa, exponent, sign) = Float::integer_decode(value);
    let mut n = BigInt::from(mantissa);
    if sign < 0 {
        n = -n;
    }
    if exponent >= 0 {
        BigDecimal::new(n << exponent as usize, 0)
    } else {
        let digits = u32::from(exponent.unsigned_abs());
        BigDecimal::new(n * BigInt::from(5).pow(digits), i64::from(digits))
    }
}

/// Generator for `f32` and `f64` over a closed range, `[-1000, 1000]` by default
#[derive(Debug, Clone)]
pub struct FloatGenerator {
    kind: FloatKind,
    min: f64,
    max: f64,
}

impl FloatGenerator {
    pub fn new(kind: FloatKind) -> Self {
        Self {
            kind,
            min: -1000.0,
            max: 1000.0,
        }
    }

    pub fn in_range(kind: FloatKind, min: f64, max: f64) -> Result<Self, GenerationError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(GenerationError::illegal_range(min, max));
        }
        Ok(Self { kind, min, max })
    }

    fn least(&self) -> f64 {
        if self.min > 0.0 {
            self.min
        } else if self.max < 0.0 {
            self.max
        } else {
            0.0
        }
    }

    fn admits(&self, candidate: f64) -> bool {
        candidate.is_finite() && candidate >= self.min && candidate <= self.max
    }
}

impl Generator for FloatGenerator {
    fn types(&self) -> Vec<String> {
        vec![self.kind.type_name().to_string()]
    }

    fn generate(
        &self,
        random: &mut SourceOfRandomness,
        _context: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        match self.kind {
            FloatKind::F32 => random
                .next_float_in(self.min as f32, self.max as f32)
                .map(Value::F32),
            FloatKind::F64 => random.next_double_in(self.min, self.max).map(Value::F64),
        }
    }

    fn shrink(&self, _random: &mut SourceOfRandomness, value: &Value) -> Box<dyn Iterator<Item = Value>> {
        let Some(value) = self.kind.from_value(value).filter(|v| v.is_finite()) else {
            return Box::new(std::iter::empty());
        };
        let least = self.least();
        if value == least {
            return Box::new(std::iter::empty());
        }
        let mut proposals = Vec::new();
        if value < 0.0 {
            proposals.push(-value);
        }
        proposals.push(least);
        proposals.push(value.trunc());

        let distance = (value - least).abs();
        let direction = if value > least { -1.0 } else { 1.0 };
        let mut step = distance / 2.0;
        while proposals.len() < MAX_HALVING_CANDIDATES + 3 {
            let candidate = value + direction * step;
            if candidate == value {
                break;
            }
            proposals.push(candidate);
            step /= 2.0;
        }

        let original = self.kind.to_value(value);
        let mut candidates: Vec<Value> = Vec::new();
        for proposal in proposals {
            if !self.admits(proposal) {
                continue;
            }
            let candidate = self.kind.to_value(proposal);
            if candidate != original && !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        Box::new(candidates.into_iter())
    }

    fn can_shrink(&self, value: &Value) -> bool {
        self.kind.from_value(value).is_some()
    }

    fn magnitude(&self, value: &Value) -> BigDecimal {
        self.kind.from_value(value).map_or_else(BigDecimal::zero, |v| {
            (exact_decimal(v) - exact_decimal(self.least())).abs()
        })
    }

    fn configure(&mut self, directive: &Directive) -> Result<(), GenerationError> {
        match directive {
            Directive::InRange { min, max } => {
                let min = match min.as_deref() {
                    Some(text) => parse_bound::<f64>(directive, text)?,
                    None => self.min,
                };
                let max = match max.as_deref() {
                    Some(text) => parse_bound::<f64>(directive, text)?,
                    None => self.max,
                };
                if min.is_nan() || max.is_nan() {
                    return Err(GenerationError::invalid_directive(directive, "NaN bound"));
                }
                if min > max {
                    return Err(GenerationError::illegal_range(min, max));
                }
                self.min = min;
                self.max = max;
                Ok(())
            }
            other => Err(GenerationError::unsupported_directive(
                self.kind.type_name(),
                other,
            )),
        }
    }

    fn copy(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|v| BigInt::from(*v)).collect()
    }

    fn shrinks_of(generator: &dyn Generator, value: &Value) -> Vec<Value> {
        let mut random = SourceOfRandomness::new(0);
        generator.shrink(&mut random, value).collect()
    }

    #[test]
    fn test_halving_sequence_ends_next_to_value() {
        let sequence = halving_sequence(&BigInt::from(237), &BigInt::zero());
        assert_eq!(sequence, ints(&[119, 178, 208, 223, 230, 234, 236]));

        let sequence = halving_sequence(&BigInt::from(-20), &BigInt::zero());
        assert_eq!(sequence, ints(&[-10, -15, -18, -19]));
    }

    #[test]
    fn test_halving_sequence_is_capped() {
        let huge = BigInt::from(1u64 << 40);
        assert_eq!(
            halving_sequence(&huge, &BigInt::zero()).len(),
            MAX_HALVING_CANDIDATES
        );
    }

    #[test]
    fn test_negative_values_propose_positive_counterpart_first() {
        let candidates = integral_shrinks(&BigInt::from(-6), None, None);
        assert_eq!(candidates, ints(&[6, 0, -3, -5]));
    }

    #[test]
    fn test_shrinks_respect_range() {
        let min = BigInt::from(10);
        let max = BigInt::from(100);
        let candidates = integral_shrinks(&BigInt::from(50), Some(&min), Some(&max));
        assert_eq!(candidates[0], BigInt::from(10));
        assert!(candidates.iter().all(|c| *c >= min && *c <= max));
        assert!(integral_shrinks(&min, Some(&min), Some(&max)).is_empty());
    }

    #[test]
    fn test_least_magnitude_value_has_no_shrinks() {
        for kind in IntegralKind::ALL {
            let generator = IntegralGenerator::new(kind);
            let zero = kind.to_value(&BigInt::zero()).unwrap();
            assert!(shrinks_of(&generator, &zero).is_empty(), "{:?}", kind);
        }
    }

    #[test]
    fn test_integral_shrink_monotonicity() {
        let generator = IntegralGenerator::in_range(IntegralKind::I32, -1000, 1000).unwrap();
        let mut random = SourceOfRandomness::new(31);
        let mut context = GenerationContext::new(10);
        for _ in 0..200 {
            let value = generator.generate(&mut random, &mut context).unwrap();
            let magnitude = generator.magnitude(&value);
            for candidate in shrinks_of(&generator, &value) {
                assert!(generator.magnitude(&candidate) <= magnitude);
                assert_ne!(candidate, value);
            }
        }
    }

    #[test]
    fn test_integral_generation_respects_configured_range() {
        let mut generator = IntegralGenerator::new(IntegralKind::I16);
        generator.configure(&Directive::in_range(-4, 5)).unwrap();
        let mut random = SourceOfRandomness::new(32);
        let mut context = GenerationContext::new(10);
        for _ in 0..1_000 {
            match generator.generate(&mut random, &mut context).unwrap() {
                Value::I16(v) => assert!((-4..=5).contains(&v)),
                other => panic!("unexpected {}", other),
            }
        }
    }

    #[test]
    fn test_integral_configuration_errors() {
        let mut generator = IntegralGenerator::new(IntegralKind::U8);
        assert!(matches!(
            generator.configure(&Directive::in_range(5, -4)),
            Err(GenerationError::InvalidDirective { .. })
        ));
        assert!(matches!(
            generator.configure(&Directive::in_range(9, 3)),
            Err(GenerationError::IllegalRange { .. })
        ));
        assert!(matches!(
            generator.configure(&Directive::at_least("ten")),
            Err(GenerationError::InvalidDirective { .. })
        ));
        assert!(matches!(
            generator.configure(&Directive::size(1, 2)),
            Err(GenerationError::UnsupportedDirective { .. })
        ));
    }

    #[test]
    fn test_partial_ranges_keep_the_other_bound() {
        let mut generator = IntegralGenerator::new(IntegralKind::I32);
        generator.configure(&Directive::at_least(10)).unwrap();
        generator.configure(&Directive::at_most(20)).unwrap();
        assert_eq!(generator.min(), Some(&BigInt::from(10)));
        assert_eq!(generator.max(), Some(&BigInt::from(20)));

        let mut generator = IntegralGenerator::new(IntegralKind::I32);
        generator.configure(&Directive::at_most(20)).unwrap();
        generator.configure(&Directive::at_least(10)).unwrap();
        assert_eq!(generator.min(), Some(&BigInt::from(10)));
        assert_eq!(generator.max(), Some(&BigInt::from(20)));

        let mut random = SourceOfRandomness::new(36);
        let mut context = GenerationContext::new(100);
        for _ in 0..500 {
            match generator.generate(&mut random, &mut context).unwrap() {
                Value::I32(v) => assert!((10..=20).contains(&v)),
                other => panic!("unexpected {}", other),
            }
        }
        assert!(matches!(
            generator.configure(&Directive::at_least(21)),
            Err(GenerationError::IllegalRange { .. })
        ));
    }

    #[test]
    fn test_partial_decimal_ranges_keep_the_other_bound() {
        let low = BigDecimal::from_str("1.5").unwrap();
        let high = BigDecimal::from_str("3.5").unwrap();
        for directives in [
            [Directive::at_least("1.5"), Directive::at_most("3.5")],
            [Directive::at_most("3.5"), Directive::at_least("1.5")],
        ] {
            let mut generator = DecimalGenerator::new();
            for directive in &directives {
                generator.configure(directive).unwrap();
            }
            let mut random = SourceOfRandomness::new(37);
            let mut context = GenerationContext::new(50);
            for _ in 0..300 {
                let Value::Decimal(decimal) = generator.generate(&mut random, &mut context).unwrap()
                else {
                    panic!("expected a decimal");
                };
                assert!(decimal >= low && decimal <= high, "{}", decimal);
            }
        }
    }

    #[test]
    fn test_unbounded_big_integers_grow_with_size() {
        let generator = IntegralGenerator::new(IntegralKind::Big);
        let mut random = SourceOfRandomness::new(33);
        let mut context = GenerationContext::new(4);
        for _ in 0..500 {
            match generator.generate(&mut random, &mut context).unwrap() {
                Value::BigInt(v) => assert!(v.abs() < BigInt::from(32)),
                other => panic!("unexpected {}", other),
            }
        }
    }

    #[test]
    fn test_decimal_generation_and_shrinking() {
        let mut generator = DecimalGenerator::new();
        generator
            .configure(&Directive::in_range("-2.5", "7.25"))
            .unwrap();
        generator.configure(&Directive::precision(3)).unwrap();

        let mut random = SourceOfRandomness::new(34);
        let mut context = GenerationContext::new(3);
        let min = BigDecimal::from_str("-2.5").unwrap();
        let max = BigDecimal::from_str("7.25").unwrap();
        for _ in 0..500 {
            let value = generator.generate(&mut random, &mut context).unwrap();
            let Value::Decimal(ref decimal) = value else {
                panic!("unexpected {}", value);
            };
            assert!(*decimal >= min && *decimal <= max);
            assert_eq!(decimal.as_bigint_and_exponent().1, 3);

            let magnitude = generator.magnitude(&value);
            for candidate in shrinks_of(&generator, &value) {
                assert!(generator.magnitude(&candidate) <= magnitude);
            }
        }

        let candidates = shrinks_of(
            &generator,
            &Value::Decimal(BigDecimal::from_str("5.5").unwrap()),
        );
        assert_eq!(candidates[0], Value::Decimal(BigDecimal::zero()));
        assert_eq!(
            candidates[1],
            Value::Decimal(BigDecimal::from_str("5").unwrap())
        );
        assert!(shrinks_of(&generator, &Value::Decimal(BigDecimal::zero())).is_empty());
    }

    #[test]
    fn test_exact_float_magnitude() {
        assert_eq!(exact_decimal(0.5), BigDecimal::from_str("0.5").unwrap());
        assert_eq!(exact_decimal(-3.0), BigDecimal::from(-3));
        assert_ne!(exact_decimal(0.1), BigDecimal::from_str("0.1").unwrap());
    }

    #[test]
    fn test_float_shrinking() {
        let generator = FloatGenerator::new(FloatKind::F64);
        let candidates = shrinks_of(&generator, &Value::F64(-12.75));
        assert_eq!(candidates[0], Value::F64(12.75));
        assert_eq!(candidates[1], Value::F64(0.0));
        assert_eq!(candidates[2], Value::F64(-12.0));
        assert!(shrinks_of(&generator, &Value::F64(0.0)).is_empty());
        assert!(shrinks_of(&generator, &Value::F64(-0.0)).is_empty());
        assert!(shrinks_of(&FloatGenerator::new(FloatKind::F32), &Value::F32(-0.0)).is_empty());

        let magnitude = generator.magnitude(&Value::F64(-12.75));
        for candidate in candidates {
            assert!(generator.magnitude(&candidate) <= magnitude);
        }
    }

    #[test]
    fn test_float_range() {
        let generator = FloatGenerator::in_range(FloatKind::F32, -1.5, 2.5).unwrap();
        let mut random = SourceOfRandomness::new(35);
        let mut context = GenerationContext::new(0);
        for _ in 0..1_000 {
            match generator.generate(&mut random, &mut context).unwrap() {
                Value::F32(v) => assert!((-1.5..=2.5).contains(&v)),
                other => panic!("unexpected {}", other),
            }
        }
        assert!(FloatGenerator::in_range(FloatKind::F64, 1.0, 0.0).is_err());
    }
}
