//! Pair generation: uniform random colours, seedable for replays and tests.

use crate::board::Puyo;
use crate::piece::Pair;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Source of upcoming pairs.
pub trait PairSource: fmt::Debug {
    fn next_pair(&mut self) -> Pair;
}

/// Each half drawn independently and uniformly from the four colours.
#[derive(Debug, Clone)]
pub struct RandomPairs {
    rng: StdRng,
}

impl RandomPairs {
    /// Seeded when `seed` is given, otherwise from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    fn random_puyo(&mut self) -> Puyo {
        Puyo::ALL[self.rng.random_range(0..Puyo::ALL.len())]
    }
}

impl PairSource for RandomPairs {
    fn next_pair(&mut self) -> Pair {
        let main = self.random_puyo();
        let sub = self.random_puyo();
        Pair::new(main, sub)
    }
}

/// Replays a fixed list of pairs, wrapping around at the end.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ScriptedPairs {
    pairs: Vec<Pair>,
    cursor: usize,
}

#[cfg(test)]
impl ScriptedPairs {
    pub fn new(pairs: Vec<Pair>) -> Self {
        assert!(!pairs.is_empty(), "scripted pair list must not be empty");
        Self { pairs, cursor: 0 }
    }
}

#[cfg(test)]
impl PairSource for ScriptedPairs {
    fn next_pair(&mut self) -> Pair {
        let pair = self.pairs[self.cursor % self.pairs.len()];
        self.cursor += 1;
        pair
    }
}
