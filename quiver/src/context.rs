//! Per-trial generation state and the size distribution.

use std::any::Any;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::rng::SourceOfRandomness;

/// Default number of discards tolerated per success
pub const DEFAULT_MAX_DISCARD_RATIO: f64 = 10.0;

/// Mutable state threaded through one value's generation call tree.
///
/// The context is owned by a single trial. Generators read `size` as their
/// magnitude budget and may use the keyed side channel to pass information,
/// such as a remaining recursion depth, to generators they invoke.
pub struct GenerationContext {
    size: usize,
    successes: usize,
    discards: usize,
    max_discard_ratio: f64,
    side_channel: HashMap<String, Box<dyn Any + Send>>,
}

impl GenerationContext {
    pub fn new(size: usize) -> Self {
        Self::with_discard_ratio(size, DEFAULT_MAX_DISCARD_RATIO)
    }

    pub fn with_discard_ratio(size: usize, max_discard_ratio: f64) -> Self {
        Self {
            size,
            successes: 0,
            discards: 0,
            max_discard_ratio,
            side_channel: HashMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn successes(&self) -> usize {
        self.successes
    }

    pub fn discards(&self) -> usize {
        self.discards
    }

    /// Record a value that satisfied its constraint
    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    /// Record a rejected value.
    ///
    /// Fails with [`GenerationError::TooManyDiscards`] once
    /// `discards / max(successes, 1)` exceeds the configured ratio. Before the
    /// first success the denominator is one, so a trial that never succeeds
    /// still gives up after a bounded number of discards.
    pub fn record_discard(&mut self) -> Result<(), GenerationError> {
        self.discards += 1;
        let ratio = self.discards as f64 / self.successes.max(1) as f64;
        if ratio > self.max_discard_ratio {
            warn!(
                discards = self.discards,
                successes = self.successes,
                max_ratio = self.max_discard_ratio,
                "discard ratio exceeded"
            );
            return Err(GenerationError::TooManyDiscards {
                discards: self.discards,
                successes: self.successes,
                max_ratio: self.max_discard_ratio,
            });
        }
        debug!(discards = self.discards, "value discarded");
        Ok(())
    }

    /// Store a side-channel value under `key`, replacing any previous one
    pub fn set<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.side_channel.insert(key.into(), Box::new(value));
    }

    /// Read a side-channel value; `None` when absent or of another type
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.side_channel
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.side_channel.remove(key).is_some()
    }

    /// Run `f` one recursion level deeper under the depth budget stored at `key`.
    ///
    /// `f` receives the depth remaining for its own call: `initial` at the
    /// outermost level, one less on each nested call, never below zero. A
    /// generator must produce a base case when it receives zero. The budget is
    /// restored when `f` returns, so sibling calls see the same depth.
    pub fn recurse<R>(
        &mut self,
        key: &str,
        initial: usize,
        f: impl FnOnce(&mut Self, usize) -> R,
    ) -> R {
        let previous = self.get::<usize>(key).copied();
        let remaining = previous.unwrap_or(initial);
        self.set(key, remaining.saturating_sub(1));
        let result = f(self, remaining);
        match previous {
            Some(depth) => self.set(key, depth),
            None => {
                self.remove(key);
            }
        }
        result
    }
}

impl std::fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationContext")
            .field("size", &self.size)
            .field("successes", &self.successes)
            .field("discards", &self.discards)
            .field("max_discard_ratio", &self.max_discard_ratio)
            .field("keys", &self.side_channel.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Geometric distribution (number of trials until the first success).
///
/// Certain success (`p == 1`) samples zero, so trial 0 gets an empty size budget.
pub struct GeometricDistribution;

impl GeometricDistribution {
    /// Sample with success probability `p` in `(0, 1]`
    pub fn sample(p: f64, random: &mut SourceOfRandomness) -> Result<usize, GenerationError> {
        if !(p > 0.0 && p <= 1.0) {
            return Err(GenerationError::illegal_range(p, 1));
        }
        if p == 1.0 {
            return Ok(0);
        }
        let uniform = random.next_double();
        let trials = ((1.0 - uniform).ln() / (1.0 - p).ln()).ceil();
        Ok(if trials.is_finite() && trials > 0.0 {
            trials as usize
        } else {
            0
        })
    }

    /// Sample with the given mean; means below one are treated as one
    pub fn sample_with_mean(
        mean: f64,
        random: &mut SourceOfRandomness,
    ) -> Result<usize, GenerationError> {
        Self::sample(1.0 / mean.max(1.0), random)
    }

    /// Size budget for the trial with zero-based index `trial`
    pub fn size_for_trial(trial: usize, random: &mut SourceOfRandomness) -> usize {
        Self::sample_with_mean(trial as f64 + 1.0, random).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discard_ratio_with_no_successes() {
        let mut context = GenerationContext::with_discard_ratio(5, 2.0);
        assert!(context.record_discard().is_ok());
        assert!(context.record_discard().is_ok());
        assert!(matches!(
            context.record_discard(),
            Err(GenerationError::TooManyDiscards { discards: 3, .. })
        ));
    }

    #[test]
    fn test_successes_raise_the_discard_allowance() {
        let mut context = GenerationContext::with_discard_ratio(5, 1.0);
        context.record_success();
        context.record_success();
        assert!(context.record_discard().is_ok());
        assert!(context.record_discard().is_ok());
        assert!(context.record_discard().is_err());
        assert_eq!(context.successes(), 2);
        assert_eq!(context.discards(), 3);
    }

    #[test]
    fn test_side_channel_is_typed() {
        let mut context = GenerationContext::new(0);
        context.set("depth", 3usize);
        assert_eq!(context.get::<usize>("depth"), Some(&3));
        assert_eq!(context.get::<String>("depth"), None);
        assert!(context.remove("depth"));
        assert_eq!(context.get::<usize>("depth"), None);
    }

    #[derive(Debug, PartialEq)]
    enum Tree {
        Leaf,
        Node(Vec<Tree>),
    }

    fn grow(context: &mut GenerationContext) -> Tree {
        context.recurse("tree.depth", 3, |context, remaining| {
            if remaining == 0 {
                Tree::Leaf
            } else {
                Tree::Node(vec![grow(context), grow(context)])
            }
        })
    }

    fn depth(tree: &Tree) -> usize {
        match tree {
            Tree::Leaf => 0,
            Tree::Node(children) => 1 + children.iter().map(depth).max().unwrap_or(0),
        }
    }

    #[test]
    fn test_recursion_budget_forces_base_case() {
        let mut context = GenerationContext::new(10);
        let tree = grow(&mut context);
        assert_eq!(depth(&tree), 3);
        assert_eq!(context.get::<usize>("tree.depth"), None);
    }

    #[test]
    fn test_geometric_sizes() {
        let mut random = SourceOfRandomness::new(21);
        assert_eq!(GeometricDistribution::size_for_trial(0, &mut random), 0);

        let total: usize = (0..2_000)
            .map(|_| GeometricDistribution::sample_with_mean(10.0, &mut random).unwrap())
            .sum();
        let mean = total as f64 / 2_000.0;
        assert!(mean > 7.0 && mean < 13.0, "mean was {}", mean);

        assert!(GeometricDistribution::sample(0.0, &mut random).is_err());
        assert!(GeometricDistribution::sample(1.5, &mut random).is_err());
    }

    #[test]
    fn test_geometric_counts_the_successful_trial() {
        let mut random = SourceOfRandomness::new(22);
        for _ in 0..1_000 {
            assert!(GeometricDistribution::sample(0.5, &mut random).unwrap() >= 1);
        }
    }

    #[test]
    fn test_size_is_reproducible_from_seed() {
        let mut first = SourceOfRandomness::new(8);
        let mut second = SourceOfRandomness::new(8);
        assert_eq!(
            GeometricDistribution::size_for_trial(40, &mut first),
            GeometricDistribution::size_for_trial(40, &mut second)
        );
    }
}
