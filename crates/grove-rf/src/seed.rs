//! Group-wide agreement on per-tree random streams.

use grove_comm::{Communicator, Rank};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::RfError;

/// The run-level random stream that round seeds are drawn from.
///
/// Every member holds one seeded identically, but only the root's draws
/// are ever used: each round the root draws first and then broadcasts.
#[derive(Debug, Clone)]
pub struct SeedSource {
    rng: ChaCha8Rng,
}

impl SeedSource {
    /// Seed the stream with the run seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Agree on the next round seed across the whole group.
    ///
    /// This is a collective: every member must call it once per round.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::Group`] if the broadcast fails.
    pub fn next_round<C: Communicator>(&mut self, comm: &C) -> Result<u64, RfError> {
        let drawn = comm.rank().is_root().then(|| self.rng.r#gen::<u64>());
        Ok(comm.broadcast(Rank::ROOT, drawn)?)
    }
}

/// Seed of the private stream of global tree `tree_id` in a round.
#[must_use]
pub fn tree_seed(round_seed: u64, tree_id: usize) -> u64 {
    round_seed.wrapping_add(tree_id as u64)
}

/// The random stream a single tree draws its feature samples from.
#[must_use]
pub fn tree_rng(round_seed: u64, tree_id: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(tree_seed(round_seed, tree_id))
}
