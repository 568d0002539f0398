//! Frequency tallies and the conditional probability model.

use std::collections::BTreeMap;

use crate::error::LinkageError;
use crate::model::{FrequencyTable, ProbabilityModel, RecordPair, RecordSet, TrainingCorpus, VectorStats};
use crate::similarity::Quantizer;
use crate::vector::build_vector;

/// Tally the comparison vectors of a set of labeled pairs.
///
/// Fails on sources with different comparable field counts, and on pair
/// indices past the end of either source.
pub fn tally(
    quantizer: &Quantizer,
    left: &RecordSet,
    right: &RecordSet,
    pairs: &[RecordPair],
) -> Result<FrequencyTable, LinkageError> {
    left.check_compatible(right)?;
    let mut table = FrequencyTable::new();
    for (line, pair) in pairs.iter().enumerate() {
        let (a, b) = match (left.get(pair.left), right.get(pair.right)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(LinkageError::LinkOutOfRange {
                    line: line + 1,
                    left: pair.left,
                    right: pair.right,
                })
            }
        };
        table.add(build_vector(quantizer, a, b));
    }
    Ok(table)
}

/// Normalize both tallies into `u`/`m` and attach a likelihood ratio per vector.
///
/// Every vector observed under either label gets an entry; a label that never
/// produced the vector leaves the corresponding probability as `None`.
pub fn estimate(
    matches: &FrequencyTable,
    nonmatches: &FrequencyTable,
) -> Result<ProbabilityModel, LinkageError> {
    if matches.is_empty() {
        return Err(LinkageError::EmptyTrainingSet { label: "known match" });
    }
    if nonmatches.is_empty() {
        return Err(LinkageError::EmptyTrainingSet { label: "presumed non-match" });
    }

    let match_total = matches.total() as f64;
    let nonmatch_total = nonmatches.total() as f64;

    let mut stats: BTreeMap<_, VectorStats> = BTreeMap::new();
    for (vector, count) in nonmatches.iter() {
        stats.insert(
            vector.clone(),
            VectorStats {
                u: Some(count as f64 / nonmatch_total),
                m: None,
            },
        );
    }
    for (vector, count) in matches.iter() {
        stats
            .entry(vector.clone())
            .or_insert(VectorStats { u: None, m: None })
            .m = Some(count as f64 / match_total);
    }

    log::debug!(
        "estimated model: {} vector(s) from {} match / {} non-match pair(s)",
        stats.len(),
        matches.total(),
        nonmatches.total()
    );

    Ok(ProbabilityModel::from_stats(stats))
}

/// Tally both halves of a corpus and estimate the model.
pub fn train(
    quantizer: &Quantizer,
    left: &RecordSet,
    right: &RecordSet,
    corpus: &TrainingCorpus,
) -> Result<ProbabilityModel, LinkageError> {
    let matches = tally(quantizer, left, right, &corpus.known_matches)?;
    let nonmatches = tally(quantizer, left, right, &corpus.presumed_nonmatches)?;
    estimate(&matches, &nonmatches)
}
