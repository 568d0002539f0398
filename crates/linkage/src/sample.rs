//! Presumed non-match sampling.
//!
//! Random cross-source pairs are overwhelmingly non-matches, so a uniform
//! sample stands in for the non-match label. The few true matches it picks up
//! are accepted as label noise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::RecordPair;

/// Draw `n` left indices and `n` right indices independently, uniformly and
/// with replacement, then pair them up by position.
///
/// Each side has its own seeded generator, so the same seeds always give the
/// same sample. Returns an empty sample when either side is empty.
pub fn sample_presumed_nonmatches(
    left_len: usize,
    right_len: usize,
    n: usize,
    left_seed: u64,
    right_seed: u64,
) -> Vec<RecordPair> {
    if left_len == 0 || right_len == 0 {
        return Vec::new();
    }
    let mut left_rng = StdRng::seed_from_u64(left_seed);
    let mut right_rng = StdRng::seed_from_u64(right_seed);

    let lefts: Vec<usize> = (0..n).map(|_| left_rng.gen_range(0..left_len)).collect();
    let rights: Vec<usize> = (0..n).map(|_| right_rng.gen_range(0..right_len)).collect();

    lefts
        .into_iter()
        .zip(rights)
        .map(|(l, r)| RecordPair::new(l, r))
        .collect()
}
