//! Likelihood-ratio partition of the comparison-vector space.
//!
//! Vectors are ranked by descending `m/u`. The top of the ranking becomes the
//! match set while its cumulative `u` mass stays within `mu`; the bottom of
//! what remains becomes the non-match set while its cumulative `m` mass stays
//! within `lambda`. Everything else, including every vector the training data
//! never produced, needs manual review.

use std::collections::BTreeSet;

use crate::error::LinkageError;
use crate::model::{Disposition, ProbabilityModel, VectorStats};
use crate::vector::{ComparisonVector, VectorSpace};

/// Slack allowed when comparing accumulated mass against a bound, so that a
/// bound of exactly 1.0 admits every vector despite rounding in the sum.
pub const MASS_EPSILON: f64 = 1e-12;

/// Three disjoint sets covering the vector space exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionSets {
    pub match_set: BTreeSet<ComparisonVector>,
    pub nonmatch_set: BTreeSet<ComparisonVector>,
    pub possible_set: BTreeSet<ComparisonVector>,
    /// Sum of `u` over the match set.
    pub false_positive_mass: f64,
    /// Sum of `m` over the non-match set.
    pub false_negative_mass: f64,
}

impl DecisionSets {
    /// Route a vector. Anything outside the match and non-match sets is a
    /// possible match, including vectors of the wrong width.
    pub fn disposition(&self, vector: &ComparisonVector) -> Disposition {
        if self.match_set.contains(vector) {
            Disposition::Match
        } else if self.nonmatch_set.contains(vector) {
            Disposition::NonMatch
        } else {
            Disposition::Possible
        }
    }

    pub fn len(&self) -> usize {
        self.match_set.len() + self.nonmatch_set.len() + self.possible_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check that an error bound is a probability.
pub fn validate_bound(name: &'static str, value: f64) -> Result<(), LinkageError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LinkageError::BoundOutOfRange { name, value })
    }
}

/// Model vectors by descending likelihood ratio. Infinite ratios come first;
/// ties keep the model's natural vector order.
pub fn rank(model: &ProbabilityModel) -> Vec<(&ComparisonVector, &VectorStats)> {
    let mut ranked: Vec<_> = model.iter().collect();
    ranked.sort_by(|a, b| b.1.ratio().cmp(&a.1.ratio()));
    ranked
}

/// Partition `space` into match / non-match / possible sets.
///
/// `mu` bounds the non-match probability mass called a match (false
/// positives); `lambda` bounds the match probability mass called a non-match
/// (false negatives).
pub fn partition(
    model: &ProbabilityModel,
    space: VectorSpace,
    mu: f64,
    lambda: f64,
) -> Result<DecisionSets, LinkageError> {
    validate_bound("mu", mu)?;
    validate_bound("lambda", lambda)?;
    if let Some((vector, _)) = model.iter().find(|(v, _)| !space.contains(v)) {
        return Err(LinkageError::ConfigValidation(format!(
            "model vector {vector} has {} level(s) but the vector space has width {}",
            vector.len(),
            space.width()
        )));
    }

    let mut sets = DecisionSets::default();
    let ranked = rank(model);

    // Top of the ranking: accept while the u mass fits under mu.
    let mut stop = ranked.len();
    for (i, (vector, stats)) in ranked.iter().enumerate() {
        let ratio = stats.ratio();
        if ratio.is_infinite() {
            sets.match_set.insert((*vector).clone());
            continue;
        }
        let u = stats.u_mass();
        if sets.false_positive_mass + u <= mu + MASS_EPSILON {
            sets.false_positive_mass += u;
            sets.match_set.insert((*vector).clone());
            log::debug!("match    {vector} u={u:.6} ratio={ratio}");
        } else {
            // The vector that overflows mu belongs to the remaining pool.
            stop = i;
            break;
        }
    }

    // Bottom of the remaining pool: accept while the m mass fits under lambda.
    let mut pool = ranked[stop..].iter().rev();
    for (vector, stats) in pool.by_ref() {
        let m = stats.m_mass();
        if sets.false_negative_mass + m <= lambda + MASS_EPSILON {
            sets.false_negative_mass += m;
            sets.nonmatch_set.insert((*vector).clone());
            log::debug!("nonmatch {vector} m={m:.6} ratio={}", stats.ratio());
        } else {
            sets.possible_set.insert((*vector).clone());
            break;
        }
    }
    for (vector, _) in pool {
        sets.possible_set.insert((*vector).clone());
    }

    // Vectors the training data never produced.
    let mut unknown = 0usize;
    for vector in space.iter() {
        if !model.contains(&vector) {
            sets.possible_set.insert(vector);
            unknown += 1;
        }
    }

    log::info!(
        "partitioned {} vector(s): {} match, {} non-match, {} possible ({} unseen in training)",
        sets.len(),
        sets.match_set.len(),
        sets.nonmatch_set.len(),
        sets.possible_set.len(),
        unknown
    );

    Ok(sets)
}
