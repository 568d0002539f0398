use crate::engine::LinkageOutcome;
use crate::model::{LinkageSummary, ProbabilityModel, TrainingCorpus, VectorEvidence};
use crate::partition::DecisionSets;
use crate::vector::VectorSpace;

/// One evidence row per vector of the space, in enumeration order.
pub fn build_evidence(
    model: &ProbabilityModel,
    decisions: &DecisionSets,
    space: VectorSpace,
) -> Vec<VectorEvidence> {
    space
        .iter()
        .map(|vector| {
            let stats = model.get(&vector);
            VectorEvidence {
                u: stats.and_then(|s| s.u),
                m: stats.and_then(|s| s.m),
                ratio: stats.map(|s| s.ratio()),
                decision: decisions.disposition(&vector),
                vector,
            }
        })
        .collect()
}

/// Compute summary statistics from a linkage outcome.
pub fn compute_summary(outcome: &LinkageOutcome, corpus: &TrainingCorpus) -> LinkageSummary {
    let c = &outcome.classification;
    let d = &outcome.decisions;
    LinkageSummary {
        candidate_pairs: c.len(),
        matches: c.matches.len(),
        possibles: c.possibles.len(),
        nonmatches: c.nonmatches.len(),
        vector_space: d.len(),
        observed_vectors: outcome.model.len(),
        match_vectors: d.match_set.len(),
        possible_vectors: d.possible_set.len(),
        nonmatch_vectors: d.nonmatch_set.len(),
        false_positive_mass: d.false_positive_mass,
        false_negative_mass: d.false_negative_mass,
        training_matches: corpus.known_matches.len(),
        training_nonmatches: corpus.presumed_nonmatches.len(),
    }
}
