//! Deterministic, reseedable source of randomness shared by every generator.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::error::GenerationError;

/// A reseedable random source that remembers the seed it was last seeded with.
///
/// Two instances seeded with the same value and driven through the same call
/// sequence produce identical outputs. Ranged draws are closed intervals and
/// reject `min > max` with [`GenerationError::IllegalRange`].
#[derive(Debug, Clone)]
pub struct SourceOfRandomness {
    inner: StdRng,
    seed: i64,
    next_gaussian: Option<f64>,
}

impl SourceOfRandomness {
    /// Create a source seeded with `seed`
    pub fn new(seed: i64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed as u64),
            seed,
            next_gaussian: None,
        }
    }

    /// Create a source with a seed drawn from OS entropy
    pub fn from_entropy() -> Self {
        let seed = StdRng::from_entropy().next_u64() as i64;
        Self::new(seed)
    }

    /// Adopt an existing standard generator; `seed` is recorded for reporting.
    pub fn from_std(rng: StdRng, seed: i64) -> Self {
        Self {
            inner: rng,
            seed,
            next_gaussian: None,
        }
    }

    /// Fork an independent standard generator whose stream is derived from this source.
    ///
    /// Algorithms that want a plain [`rand::Rng`] can use the fork; replaying the
    /// same seed replays the same fork.
    pub fn to_std_rng(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.inner.next_u64())
    }

    /// The seed used to (re)seed this source
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Reseed the source; subsequent output is a pure function of `seed`
    pub fn set_seed(&mut self, seed: i64) {
        self.inner = StdRng::seed_from_u64(seed as u64);
        self.seed = seed;
        self.next_gaussian = None;
    }

    /// Fair coin flip
    pub fn next_bool(&mut self) -> bool {
        self.inner.r#gen()
    }

    /// Fill a fresh buffer of `count` random bytes
    pub fn next_bytes(&mut self, count: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; count];
        self.inner.fill_bytes(&mut bytes);
        bytes
    }

    /// Uniform `i32` over the whole type
    pub fn next_int(&mut self) -> i32 {
        self.inner.r#gen()
    }

    /// Uniform `i64` over the whole type
    pub fn next_long(&mut self) -> i64 {
        self.inner.r#gen()
    }

    /// Uniform double in `[0, 1)`
    pub fn next_double(&mut self) -> f64 {
        self.inner.r#gen()
    }

    /// Uniform float in `[0, 1)`
    pub fn next_float(&mut self) -> f32 {
        self.inner.r#gen()
    }

    /// Standard normal draw (mean 0, deviation 1), using the polar method.
    pub fn next_gaussian(&mut self) -> f64 {
        if let Some(cached) = self.next_gaussian.take() {
            return cached;
        }
        loop {
            let v1 = 2.0 * self.next_double() - 1.0;
            let v2 = 2.0 * self.next_double() - 1.0;
            let s = v1 * v1 + v2 * v2;
            if s < 1.0 && s != 0.0 {
                let multiplier = (-2.0 * s.ln() / s).sqrt();
                self.next_gaussian = Some(v2 * multiplier);
                return v1 * multiplier;
            }
        }
    }

    /// Uniform `i8` in `[min, max]`
    pub fn next_byte(&mut self, min: i8, max: i8) -> Result<i8, GenerationError> {
        self.next_long_in(i64::from(min), i64::from(max))
            .map(|value| value as i8)
    }

    /// Uniform `i16` in `[min, max]`
    pub fn next_short(&mut self, min: i16, max: i16) -> Result<i16, GenerationError> {
        self.next_long_in(i64::from(min), i64::from(max))
            .map(|value| value as i16)
    }

    /// Uniform `i32` in `[min, max]`
    pub fn next_int_in(&mut self, min: i32, max: i32) -> Result<i32, GenerationError> {
        self.next_long_in(i64::from(min), i64::from(max))
            .map(|value| value as i32)
    }

    /// Uniform `i64` in `[min, max]`
    pub fn next_long_in(&mut self, min: i64, max: i64) -> Result<i64, GenerationError> {
        if min > max {
            return Err(GenerationError::illegal_range(min, max));
        }
        if min == max {
            return Ok(min);
        }
        // Width fits in u64 even for the full i64 domain.
        let width = max.wrapping_sub(min) as u64;
        Ok(min.wrapping_add(self.bounded_u64(width) as i64))
    }

    /// Uniform `u64` in `[min, max]`
    pub fn next_unsigned_in(&mut self, min: u64, max: u64) -> Result<u64, GenerationError> {
        if min > max {
            return Err(GenerationError::illegal_range(min, max));
        }
        if min == max {
            return Ok(min);
        }
        Ok(min + self.bounded_u64(max - min))
    }

    /// Uniform double in `[min, max]`
    pub fn next_double_in(&mut self, min: f64, max: f64) -> Result<f64, GenerationError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(GenerationError::illegal_range(min, max));
        }
        if min == max {
            return Ok(min);
        }
        let unit = self.next_double();
        // Interpolating avoids overflow of `max - min` for the full domain.
        let value = min * (1.0 - unit) + max * unit;
        Ok(value.clamp(min, max))
    }

    /// Uniform float in `[min, max]`
    pub fn next_float_in(&mut self, min: f32, max: f32) -> Result<f32, GenerationError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(GenerationError::illegal_range(min, max));
        }
        if min == max {
            return Ok(min);
        }
        let unit = self.next_float();
        let value = min * (1.0 - unit) + max * unit;
        Ok(value.clamp(min, max))
    }

    /// Uniform char in `[min, max]`, skipping code points that are not scalar values
    pub fn next_char_in(&mut self, min: char, max: char) -> Result<char, GenerationError> {
        if min > max {
            return Err(GenerationError::illegal_range(min as u32, max as u32));
        }
        if min == max {
            return Ok(min);
        }
        loop {
            let code = self.next_unsigned_in(u64::from(min as u32), u64::from(max as u32))?;
            if let Some(c) = char::from_u32(code as u32) {
                return Ok(c);
            }
        }
    }

    /// Pick an element uniformly via `next_int_in(0, len - 1)`
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T, GenerationError> {
        if items.is_empty() {
            return Err(GenerationError::EmptyChoice);
        }
        let last = i64::try_from(items.len() - 1).unwrap_or(i64::MAX);
        let index = self.next_long_in(0, last)? as usize;
        Ok(&items[index])
    }

    /// Uniform `u64` in `[0, width]` by bit-length rejection sampling.
    fn bounded_u64(&mut self, width: u64) -> u64 {
        if width == u64::MAX {
            return self.inner.next_u64();
        }
        let bits = 64 - width.leading_zeros();
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        loop {
            let draw = self.inner.next_u64() & mask;
            if draw <= width {
                return draw;
            }
        }
    }
}

impl RngCore for SourceOfRandomness {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
