//! Uniform sampling over arbitrary-precision integer, decimal and time ranges.
//!
//! Integer ranges use bit-length rejection sampling: draw `bits(max - min)`
//! random bits until the draw does not exceed the width, then offset by `min`.
//! The expected number of draws is below two for any width. Decimal and time
//! ranges are shifted into integer ranges and sampled with the same algorithm.

use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeDelta, Utc};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::error::GenerationError;
use crate::rng::SourceOfRandomness;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Uniform `BigInt` in `[min, max]`
pub fn choose_big_integer(
    random: &mut SourceOfRandomness,
    min: &BigInt,
    max: &BigInt,
) -> Result<BigInt, GenerationError> {
    if min > max {
        return Err(GenerationError::illegal_range(min, max));
    }
    if min == max {
        return Ok(min.clone());
    }
    let width = max - min;
    let bits = width.bits();
    loop {
        let draw = BigInt::from(random_bits(random, bits));
        if draw <= width {
            return Ok(min + draw);
        }
    }
}

/// A non-negative integer made of `bits` uniformly random bits
pub fn random_bits(random: &mut SourceOfRandomness, bits: u64) -> BigUint {
    if bits == 0 {
        return BigUint::zero();
    }
    let byte_count = bits.div_ceil(8) as usize;
    let mut bytes = random.next_bytes(byte_count);
    let excess = (byte_count as u64 * 8 - bits) as u32;
    bytes[0] &= 0xFFu8 >> excess;
    BigUint::from_bytes_be(&bytes)
}

/// A non-negative `BigInt` of `bits` random bits, negated with probability one half
pub fn signed_random_bits(random: &mut SourceOfRandomness, bits: u64) -> BigInt {
    let magnitude = random_bits(random, bits);
    if random.next_bool() {
        BigInt::from_biguint(Sign::Minus, magnitude)
    } else {
        BigInt::from(magnitude)
    }
}

/// The scale a decimal range is sampled at: `max(0, min.scale, max.scale, precision)`
pub fn decide_scale(min: &BigDecimal, max: &BigDecimal, precision: Option<u32>) -> i64 {
    let (_, min_scale) = min.as_bigint_and_exponent();
    let (_, max_scale) = max.as_bigint_and_exponent();
    let precision = precision.map_or(0, i64::from);
    0.max(min_scale).max(max_scale).max(precision)
}

/// Uniform decimal in `[min, max]` at the decided scale
pub fn choose_big_decimal(
    random: &mut SourceOfRandomness,
    min: &BigDecimal,
    max: &BigDecimal,
    precision: Option<u32>,
) -> Result<BigDecimal, GenerationError> {
    if min > max {
        return Err(GenerationError::illegal_range(min, max));
    }
    let scale = decide_scale(min, max, precision);
    if min == max {
        return Ok(min.with_scale(scale));
    }
    let (low, _) = min.with_scale(scale).into_bigint_and_exponent();
    let (high, _) = max.with_scale(scale).into_bigint_and_exponent();
    let chosen = choose_big_integer(random, &low, &high)?;
    Ok(BigDecimal::new(chosen, scale))
}

/// Total nanoseconds since the epoch
pub fn instant_to_nanos(instant: &DateTime<Utc>) -> BigInt {
    BigInt::from(instant.timestamp()) * NANOS_PER_SECOND
        + BigInt::from(instant.timestamp_subsec_nanos())
}

/// Rebuild an instant from total nanoseconds since the epoch
pub fn nanos_to_instant(nanos: &BigInt) -> Option<DateTime<Utc>> {
    let (seconds, remainder) = split_nanos(nanos)?;
    DateTime::from_timestamp(seconds, remainder)
}

/// Total nanoseconds of a signed duration
pub fn duration_to_nanos(duration: &TimeDelta) -> BigInt {
    BigInt::from(duration.num_seconds()) * NANOS_PER_SECOND
        + BigInt::from(duration.subsec_nanos())
}

/// Rebuild a duration from total nanoseconds
pub fn nanos_to_duration(nanos: &BigInt) -> Option<TimeDelta> {
    let (seconds, remainder) = split_nanos(nanos)?;
    TimeDelta::new(seconds, remainder)
}

/// Uniform instant in `[min, max]` at nanosecond resolution
pub fn choose_instant(
    random: &mut SourceOfRandomness,
    min: &DateTime<Utc>,
    max: &DateTime<Utc>,
) -> Result<DateTime<Utc>, GenerationError> {
    if min > max {
        return Err(GenerationError::illegal_range(min, max));
    }
    if min == max {
        return Ok(*min);
    }
    let chosen = choose_big_integer(random, &instant_to_nanos(min), &instant_to_nanos(max))?;
    nanos_to_instant(&chosen).ok_or_else(|| GenerationError::illegal_range(min, max))
}

/// Uniform duration in `[min, max]` at nanosecond resolution
pub fn choose_duration(
    random: &mut SourceOfRandomness,
    min: &TimeDelta,
    max: &TimeDelta,
) -> Result<TimeDelta, GenerationError> {
    if min > max {
        return Err(GenerationError::illegal_range(min, max));
    }
    if min == max {
        return Ok(*min);
    }
    let chosen = choose_big_integer(random, &duration_to_nanos(min), &duration_to_nanos(max))?;
    nanos_to_duration(&chosen).ok_or_else(|| GenerationError::illegal_range(min, max))
}

/// Floor-split total nanoseconds into whole seconds and a non-negative remainder.
fn split_nanos(nanos: &BigInt) -> Option<(i64, u32)> {
    let per_second = BigInt::from(NANOS_PER_SECOND);
    let mut seconds = nanos / &per_second;
    let mut remainder = nanos % &per_second;
    if remainder < BigInt::zero() {
        seconds -= 1;
        remainder += &per_second;
    }
    Some((seconds.to_i64()?, remainder.to_u32()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_big_integer_range_correctness() {
        let mut random = SourceOfRandomness::new(11);
        let min = BigInt::from(-4);
        let max = BigInt::from(5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            let value = choose_big_integer(&mut random, &min, &max).unwrap();
            assert!(value >= min && value <= max);
            seen.insert(value);
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_big_integer_wide_range() {
        let mut random = SourceOfRandomness::new(12);
        let min = BigInt::from_str("-100000000000000000000000000000").unwrap();
        let max = BigInt::from_str("100000000000000000000000000000").unwrap();
        for _ in 0..1_000 {
            let value = choose_big_integer(&mut random, &min, &max).unwrap();
            assert!(value >= min && value <= max);
        }
    }

    #[test]
    fn test_big_integer_degenerate_and_inverted() {
        let mut random = SourceOfRandomness::new(13);
        let mut reference = SourceOfRandomness::new(13);
        let seven = BigInt::from(7);
        assert_eq!(choose_big_integer(&mut random, &seven, &seven).unwrap(), seven);
        assert_eq!(random.next_long(), reference.next_long());

        assert!(matches!(
            choose_big_integer(&mut random, &BigInt::from(2), &BigInt::from(1)),
            Err(GenerationError::IllegalRange { .. })
        ));
    }

    #[test]
    fn test_random_bits_respects_bit_length() {
        let mut random = SourceOfRandomness::new(14);
        for bits in 1..40u64 {
            let value = random_bits(&mut random, bits);
            assert!(value.bits() <= bits);
        }
        assert!(random_bits(&mut random, 0).is_zero());
    }

    #[test]
    fn test_decimal_scale_decision() {
        let min = BigDecimal::from_str("-1.5").unwrap();
        let max = BigDecimal::from_str("2.125").unwrap();
        assert_eq!(decide_scale(&min, &max, None), 3);
        assert_eq!(decide_scale(&min, &max, Some(6)), 6);

        let whole = BigDecimal::from_str("10").unwrap();
        assert_eq!(decide_scale(&whole, &whole, None), 0);
    }

    #[test]
    fn test_decimal_range_correctness() {
        let mut random = SourceOfRandomness::new(15);
        let min = BigDecimal::from_str("-1.5").unwrap();
        let max = BigDecimal::from_str("2.25").unwrap();
        for _ in 0..10_000 {
            let value = choose_big_decimal(&mut random, &min, &max, Some(4)).unwrap();
            assert!(value >= min && value <= max);
            assert_eq!(value.as_bigint_and_exponent().1, 4);
        }
    }

    #[test]
    fn test_instant_range_correctness() {
        let mut random = SourceOfRandomness::new(16);
        let min = DateTime::parse_from_rfc3339("1999-12-31T23:59:59.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let max = DateTime::parse_from_rfc3339("2000-01-01T00:00:01Z")
            .unwrap()
            .with_timezone(&Utc);
        for _ in 0..1_000 {
            let value = choose_instant(&mut random, &min, &max).unwrap();
            assert!(value >= min && value <= max);
        }
    }

    #[test]
    fn test_duration_range_correctness() {
        let mut random = SourceOfRandomness::new(17);
        let min = TimeDelta::new(-3, 250_000_000).unwrap();
        let max = TimeDelta::new(2, 0).unwrap();
        for _ in 0..1_000 {
            let value = choose_duration(&mut random, &min, &max).unwrap();
            assert!(value >= min && value <= max);
        }
    }

    #[test]
    fn test_nanos_round_trip_for_negative_durations() {
        let duration = TimeDelta::new(-2, 300).unwrap();
        let nanos = duration_to_nanos(&duration);
        assert_eq!(nanos_to_duration(&nanos), Some(duration));
    }
}
