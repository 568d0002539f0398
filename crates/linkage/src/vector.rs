//! Comparison vectors and the closed space they live in.

use serde::Serialize;

use crate::model::Record;
use crate::similarity::{Quantizer, SimilarityLevel};

/// Number of similarity levels, i.e. the radix of the vector space.
pub const RADIX: usize = SimilarityLevel::ALL.len();

/// Field-by-field similarity levels of one record pair, in comparable-field order.
///
/// Ordering is lexicographic with `high < medium < low` per position, which is
/// also the order [`VectorSpace::iter`] yields vectors in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComparisonVector(Vec<SimilarityLevel>);

impl ComparisonVector {
    pub fn new(levels: Vec<SimilarityLevel>) -> Self {
        Self(levels)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn levels(&self) -> &[SimilarityLevel] {
        &self.0
    }
}

impl From<Vec<SimilarityLevel>> for ComparisonVector {
    fn from(levels: Vec<SimilarityLevel>) -> Self {
        Self(levels)
    }
}

impl std::fmt::Display for ComparisonVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, level) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{level}")?;
        }
        write!(f, ")")
    }
}

/// Compare two records field by field.
///
/// Both records must carry the same number of comparable values; `RecordSet`
/// enforces this per source and the engine checks it across sources.
pub fn build_vector(quantizer: &Quantizer, a: &Record, b: &Record) -> ComparisonVector {
    debug_assert_eq!(a.values.len(), b.values.len());
    a.values
        .iter()
        .zip(&b.values)
        .map(|(va, vb)| quantizer.quantize(va, vb))
        .collect::<Vec<_>>()
        .into()
}

// ---------------------------------------------------------------------------
// Vector space
// ---------------------------------------------------------------------------

/// Every comparison vector of a given width: `RADIX^width` members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorSpace {
    width: usize,
}

impl VectorSpace {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `None` when the space is too large to count in a `usize`.
    pub fn size(&self) -> Option<usize> {
        u32::try_from(self.width)
            .ok()
            .and_then(|w| RADIX.checked_pow(w))
    }

    pub fn contains(&self, vector: &ComparisonVector) -> bool {
        vector.len() == self.width
    }

    /// Mixed-radix counter over the space, last field varying fastest.
    pub fn iter(&self) -> VectorSpaceIter {
        VectorSpaceIter {
            digits: vec![0; self.width],
            remaining: self.size(),
            done: false,
        }
    }
}

impl IntoIterator for VectorSpace {
    type Item = ComparisonVector;
    type IntoIter = VectorSpaceIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct VectorSpaceIter {
    digits: Vec<usize>,
    remaining: Option<usize>,
    done: bool,
}

impl Iterator for VectorSpaceIter {
    type Item = ComparisonVector;

    fn next(&mut self) -> Option<ComparisonVector> {
        if self.done {
            return None;
        }
        let current: Vec<SimilarityLevel> = self
            .digits
            .iter()
            .map(|&d| SimilarityLevel::ALL[d])
            .collect();

        // Increment with carry; wrapping past the first digit ends the walk.
        let mut pos = self.digits.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.digits[pos] += 1;
            if self.digits[pos] < RADIX {
                break;
            }
            self.digits[pos] = 0;
        }

        if let Some(r) = self.remaining.as_mut() {
            *r = r.saturating_sub(1);
        }
        Some(ComparisonVector(current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(r) => (r, Some(r)),
            None => (usize::MAX, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use SimilarityLevel::*;

    fn record(values: &[&str]) -> Record {
        Record {
            index: 0,
            values: values.iter().map(|v| v.to_string()).collect(),
            raw: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn build_vector_follows_field_order() {
        let q = Quantizer::default();
        let a = record(&["smith", "chicago", ""]);
        let b = record(&["smith", "boston", "12 main st"]);
        let v = build_vector(&q, &a, &b);
        assert_eq!(v.len(), 3);
        assert_eq!(v.levels()[0], High);
        assert_eq!(v.levels()[2], Low);
    }

    #[test]
    fn shared_blank_field_is_low() {
        let q = Quantizer::default();
        let a = record(&["smith", "chicago", ""]);
        let b = record(&["smith", "chicago", ""]);
        assert_eq!(build_vector(&q, &a, &b).levels(), &[High, High, Low]);
    }

    #[test]
    fn space_has_three_to_the_k_members() {
        for width in 0..=5 {
            let space = VectorSpace::new(width);
            let all: Vec<_> = space.iter().collect();
            assert_eq!(all.len(), 3usize.pow(width as u32));
            assert_eq!(Some(all.len()), space.size());
            let unique: BTreeSet<_> = all.iter().cloned().collect();
            assert_eq!(unique.len(), all.len(), "width {width} has duplicates");
            assert!(all.iter().all(|v| v.len() == width));
        }
    }

    #[test]
    fn enumeration_is_sorted() {
        let all: Vec<_> = VectorSpace::new(3).iter().collect();
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);
        assert_eq!(all[0], ComparisonVector::new(vec![High, High, High]));
        assert_eq!(all[1], ComparisonVector::new(vec![High, High, Medium]));
        assert_eq!(all[26], ComparisonVector::new(vec![Low, Low, Low]));
    }

    #[test]
    fn size_hint_counts_down() {
        let mut it = VectorSpace::new(2).iter();
        assert_eq!(it.size_hint(), (9, Some(9)));
        it.next();
        assert_eq!(it.size_hint(), (8, Some(8)));
    }

    #[test]
    fn display_tuple() {
        let v = ComparisonVector::new(vec![High, Low, Medium]);
        assert_eq!(v.to_string(), "(high, low, medium)");
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"["high","low","medium"]"#);
    }
}
