//! Route every candidate pair through the decision sets.

use rayon::prelude::*;
use serde::Serialize;

use crate::error::LinkageError;
use crate::model::{Disposition, Record, RecordPair, RecordSet};
use crate::partition::DecisionSets;
use crate::similarity::Quantizer;
use crate::vector::build_vector;

/// Candidate pairs grouped by disposition. Each list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub matches: Vec<RecordPair>,
    pub possibles: Vec<RecordPair>,
    pub nonmatches: Vec<RecordPair>,
}

impl Classification {
    pub fn push(&mut self, disposition: Disposition, pair: RecordPair) {
        match disposition {
            Disposition::Match => self.matches.push(pair),
            Disposition::Possible => self.possibles.push(pair),
            Disposition::NonMatch => self.nonmatches.push(pair),
        }
    }

    pub fn merge(mut self, other: Classification) -> Classification {
        self.matches.extend(other.matches);
        self.possibles.extend(other.possibles);
        self.nonmatches.extend(other.nonmatches);
        self
    }

    pub fn get(&self, disposition: Disposition) -> &[RecordPair] {
        match disposition {
            Disposition::Match => &self.matches,
            Disposition::Possible => &self.possibles,
            Disposition::NonMatch => &self.nonmatches,
        }
    }

    /// Total candidate pairs routed.
    pub fn len(&self) -> usize {
        self.matches.len() + self.possibles.len() + self.nonmatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sort(&mut self) {
        self.matches.sort_unstable();
        self.possibles.sort_unstable();
        self.nonmatches.sort_unstable();
    }
}

/// Comparable-field position to block on, resolved per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockingKey {
    left: usize,
    right: usize,
}

impl BlockingKey {
    fn resolve(left: &RecordSet, right: &RecordSet, field: &str) -> Result<Self, LinkageError> {
        match (left.field_index(field), right.field_index(field)) {
            (Some(l), Some(r)) => Ok(Self { left: l, right: r }),
            _ => Err(LinkageError::UnknownField(field.to_string())),
        }
    }

    fn admits(&self, a: &Record, b: &Record) -> bool {
        a.values[self.left] == b.values[self.right]
    }
}

/// Disposition of a single pair.
pub fn classify_pair(quantizer: &Quantizer, sets: &DecisionSets, a: &Record, b: &Record) -> Disposition {
    sets.disposition(&build_vector(quantizer, a, b))
}

/// Classify the cross product of `left` and `right`.
///
/// With `blocking_field`, only pairs whose values for that comparable field
/// are equal are candidates. Left records are sharded across the rayon pool;
/// each shard fills its own accumulator and the results are merged and sorted,
/// so output does not depend on scheduling.
pub fn classify(
    quantizer: &Quantizer,
    left: &RecordSet,
    right: &RecordSet,
    sets: &DecisionSets,
    blocking_field: Option<&str>,
) -> Result<Classification, LinkageError> {
    left.check_compatible(right)?;
    let blocking = blocking_field
        .map(|f| BlockingKey::resolve(left, right, f))
        .transpose()?;

    let mut out = left
        .records
        .par_iter()
        .map(|a| {
            let mut local = Classification::default();
            for b in &right.records {
                if let Some(key) = blocking {
                    if !key.admits(a, b) {
                        continue;
                    }
                }
                local.push(
                    classify_pair(quantizer, sets, a, b),
                    RecordPair::new(a.index, b.index),
                );
            }
            local
        })
        .reduce(Classification::default, Classification::merge);
    out.sort();

    if out.is_empty() && !left.is_empty() && !right.is_empty() {
        log::warn!(
            "no candidate pairs between '{}' and '{}'{}",
            left.source,
            right.source,
            blocking_field
                .map(|f| format!(" after blocking on '{f}'"))
                .unwrap_or_default()
        );
    }
    log::info!(
        "classified {} pair(s): {} match, {} possible, {} non-match",
        out.len(),
        out.matches.len(),
        out.possibles.len(),
        out.nonmatches.len()
    );

    Ok(out)
}
