//! Production planner trait and implementations.
//!
//! The parts factory asks its planner which [`DetailType`] to mint next.
//! The trait abstracts the selection mechanism: production runs use the
//! seeded uniform-random planner, while deterministic runs and tests use
//! the round-robin planner.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use warforge_types::DetailType;

/// A source of part-type choices for the factory.
pub trait DetailPlanner: Send {
    /// The type of the next detail to produce.
    fn next_type(&mut self) -> DetailType;
}

/// Picks each part type uniformly at random from a seeded generator.
///
/// The same seed always reproduces the same production sequence.
#[derive(Debug, Clone)]
pub struct UniformRandomPlanner {
    rng: SmallRng,
}

impl UniformRandomPlanner {
    /// Create a planner seeded for reproducibility.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl DetailPlanner for UniformRandomPlanner {
    fn next_type(&mut self) -> DetailType {
        let index = self.rng.random_range(0..DetailType::ALL.len());
        // The range is bounded by ALL.len(), so the lookup always hits.
        DetailType::ALL.get(index).copied().unwrap_or(DetailType::Head)
    }
}

/// Cycles through the part types in canonical order.
///
/// With a daily quota that is a multiple of four this produces a balanced
/// part mix, which makes whole runs deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinPlanner {
    next: usize,
}

impl RoundRobinPlanner {
    /// Create a planner starting at the first part type.
    pub const fn new() -> Self {
        Self { next: 0 }
    }
}

impl DetailPlanner for RoundRobinPlanner {
    fn next_type(&mut self) -> DetailType {
        let index = self.next.checked_rem(DetailType::ALL.len()).unwrap_or(0);
        self.next = index.saturating_add(1);
        DetailType::ALL.get(index).copied().unwrap_or(DetailType::Head)
    }
}
