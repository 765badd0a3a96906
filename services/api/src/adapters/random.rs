//! services/api/src/adapters/random.rs
//!
//! `RandomSource` backed by the thread-local generator from `rand`.

use rand::Rng;
use stichelbuch_core::ports::RandomSource;

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_range() {
        let mut rng = ThreadRandom;
        for len in 1..20 {
            for _ in 0..50 {
                assert!(rng.pick_index(len) < len);
            }
        }
    }
}
