//! Cycle length sources
//!
//! The controller asks a [`CycleSource`] for the duration of each phase.
//! [`RandomCycle`] draws uniformly from an inclusive millisecond range using
//! one generator seeded at construction. [`FixedCycles`] replays a fixed list
//! and exists for deterministic runs.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shortest default cycle length.
pub const DEFAULT_MIN_CYCLE: Duration = Duration::from_millis(4000);

/// Longest default cycle length.
pub const DEFAULT_MAX_CYCLE: Duration = Duration::from_millis(6000);

/// Produces the length of each successive phase.
pub trait CycleSource: Send + 'static {
    /// Returns the duration the next phase should last.
    fn next_cycle(&mut self) -> Duration;
}

/// Uniformly random cycle lengths in whole milliseconds over `[min, max]`.
#[derive(Debug, Clone)]
pub struct RandomCycle {
    rng: StdRng,
    min_ms: u64,
    max_ms: u64,
}

impl RandomCycle {
    /// Creates a source seeded once from OS entropy.
    ///
    /// Bounds given in reverse order are swapped.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self::with_rng(StdRng::from_os_rng(), min, max)
    }

    /// Creates a reproducible source from a fixed seed.
    #[must_use]
    pub fn seeded(min: Duration, max: Duration, seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), min, max)
    }

    fn with_rng(rng: StdRng, min: Duration, max: Duration) -> Self {
        let a = millis(min);
        let b = millis(max);
        Self {
            rng,
            min_ms: a.min(b),
            max_ms: a.max(b),
        }
    }

    /// Returns the inclusive bounds as durations.
    #[must_use]
    pub const fn bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_ms),
            Duration::from_millis(self.max_ms),
        )
    }
}

impl Default for RandomCycle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CYCLE, DEFAULT_MAX_CYCLE)
    }
}

impl CycleSource for RandomCycle {
    fn next_cycle(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(self.min_ms..=self.max_ms))
    }
}

/// Replays a fixed list of cycle lengths round-robin.
#[derive(Debug, Clone)]
pub struct FixedCycles {
    cycles: Vec<Duration>,
    next: usize,
}

impl FixedCycles {
    /// Creates a source that cycles through `cycles` in order.
    ///
    /// An empty list behaves like a single [`DEFAULT_MIN_CYCLE`].
    #[must_use]
    pub fn new(cycles: Vec<Duration>) -> Self {
        let cycles = if cycles.is_empty() {
            vec![DEFAULT_MIN_CYCLE]
        } else {
            cycles
        };
        Self { cycles, next: 0 }
    }

    /// Creates a source that always returns `cycle`.
    #[must_use]
    pub fn constant(cycle: Duration) -> Self {
        Self::new(vec![cycle])
    }
}

impl CycleSource for FixedCycles {
    fn next_cycle(&mut self) -> Duration {
        let cycle = self.cycles[self.next];
        self.next = (self.next + 1) % self.cycles.len();
        cycle
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_bounds() {
        let source = RandomCycle::default();
        assert_eq!(source.bounds(), (DEFAULT_MIN_CYCLE, DEFAULT_MAX_CYCLE));
    }

    #[test]
    fn test_default_draws_within_range() {
        let mut source = RandomCycle::default();
        for _ in 0..10_000 {
            let cycle = source.next_cycle();
            assert!(cycle >= DEFAULT_MIN_CYCLE, "{cycle:?} below range");
            assert!(cycle <= DEFAULT_MAX_CYCLE, "{cycle:?} above range");
        }
    }

    #[test]
    fn test_draws_are_not_constant() {
        let mut source = RandomCycle::seeded(DEFAULT_MIN_CYCLE, DEFAULT_MAX_CYCLE, 7);
        let first = source.next_cycle();
        assert!(
            (0..100).any(|_| source.next_cycle() != first),
            "generator state must advance between draws"
        );
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomCycle::seeded(DEFAULT_MIN_CYCLE, DEFAULT_MAX_CYCLE, 42);
        let mut b = RandomCycle::seeded(DEFAULT_MIN_CYCLE, DEFAULT_MAX_CYCLE, 42);
        for _ in 0..20 {
            assert_eq!(a.next_cycle(), b.next_cycle());
        }
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        let source = RandomCycle::seeded(DEFAULT_MAX_CYCLE, DEFAULT_MIN_CYCLE, 1);
        assert_eq!(source.bounds(), (DEFAULT_MIN_CYCLE, DEFAULT_MAX_CYCLE));
    }

    #[test]
    fn test_degenerate_range() {
        let d = Duration::from_millis(250);
        let mut source = RandomCycle::seeded(d, d, 3);
        assert_eq!(source.next_cycle(), d);
        assert_eq!(source.next_cycle(), d);
    }

    #[test]
    fn test_fixed_cycles_round_robin() {
        let mut source = FixedCycles::new(vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
        ]);
        assert_eq!(source.next_cycle(), Duration::from_millis(10));
        assert_eq!(source.next_cycle(), Duration::from_millis(20));
        assert_eq!(source.next_cycle(), Duration::from_millis(10));
    }

    #[test]
    fn test_fixed_cycles_empty_falls_back() {
        let mut source = FixedCycles::new(vec![]);
        assert_eq!(source.next_cycle(), DEFAULT_MIN_CYCLE);
    }

    proptest! {
        #[test]
        fn prop_seeded_draws_stay_in_bounds(seed in any::<u64>(), lo in 1_u64..10_000, span in 0_u64..10_000) {
            let min = Duration::from_millis(lo);
            let max = Duration::from_millis(lo + span);
            let mut source = RandomCycle::seeded(min, max, seed);
            for _ in 0..32 {
                let cycle = source.next_cycle();
                prop_assert!(cycle >= min && cycle <= max);
            }
        }
    }
}
