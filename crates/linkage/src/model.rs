use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};

use crate::error::LinkageError;
use crate::similarity::SimilarityLevel;
use crate::vector::ComparisonVector;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One row of a source. `values` holds the comparable fields in field order;
/// `raw` holds every column of the original row.
#[derive(Debug, Clone)]
pub struct Record {
    pub index: usize,
    pub values: Vec<String>,
    pub raw: Vec<String>,
}

/// Records from one source, indexed by position.
#[derive(Debug, Clone)]
pub struct RecordSet {
    pub source: String,
    /// Comparable field names, in vector order.
    pub fields: Vec<String>,
    /// Names of the raw columns.
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(source: impl Into<String>, fields: Vec<String>, columns: Vec<String>) -> Self {
        Self {
            source: source.into(),
            fields,
            columns,
            records: Vec::new(),
        }
    }

    /// Build a source whose raw columns are exactly its comparable fields.
    pub fn from_rows<I, R, S>(source: &str, fields: &[&str], rows: I) -> Result<Self, LinkageError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let mut set = Self::new(source, names.clone(), names);
        for row in rows {
            let values: Vec<String> = row.into_iter().map(Into::into).collect();
            set.push(values.clone(), values)?;
        }
        Ok(set)
    }

    /// Append a record; returns its index.
    pub fn push(&mut self, values: Vec<String>, raw: Vec<String>) -> Result<usize, LinkageError> {
        if values.len() != self.fields.len() {
            return Err(LinkageError::ConfigValidation(format!(
                "source '{}': record {} has {} comparable value(s), expected {}",
                self.source,
                self.records.len(),
                values.len(),
                self.fields.len()
            )));
        }
        let index = self.records.len();
        self.records.push(Record { index, values, raw });
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Both sources must agree on the number of comparable fields.
    pub fn check_compatible(&self, other: &RecordSet) -> Result<(), LinkageError> {
        if self.fields.len() != other.fields.len() {
            return Err(LinkageError::SchemaMismatch {
                left: self.fields.len(),
                right: other.fields.len(),
            });
        }
        Ok(())
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

/// A cross-source pair of record indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordPair {
    pub left: usize,
    pub right: usize,
}

impl RecordPair {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }
}

/// Labeled pairs used to estimate the model.
#[derive(Debug, Clone, Default)]
pub struct TrainingCorpus {
    pub known_matches: Vec<RecordPair>,
    /// Random cross-source sample, assumed (not verified) to be non-matches.
    pub presumed_nonmatches: Vec<RecordPair>,
}

// ---------------------------------------------------------------------------
// Frequencies + probabilities
// ---------------------------------------------------------------------------

/// Observed count per comparison vector for one label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<ComparisonVector, usize>,
    total: usize,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, vector: ComparisonVector) {
        *self.counts.entry(vector).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn get(&self, vector: &ComparisonVector) -> Option<usize> {
        self.counts.get(vector).copied()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct vectors observed.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComparisonVector, usize)> {
        self.counts.iter().map(|(v, c)| (v, *c))
    }
}

impl FromIterator<ComparisonVector> for FrequencyTable {
    fn from_iter<T: IntoIterator<Item = ComparisonVector>>(iter: T) -> Self {
        let mut table = Self::new();
        for v in iter {
            table.add(v);
        }
        table
    }
}

/// `m(w) / u(w)`. Infinite when the vector never occurred among non-matches.
///
/// Ordered so that every finite ratio sorts below `Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LikelihoodRatio {
    Finite(OrderedFloat<f64>),
    Infinite,
}

impl LikelihoodRatio {
    pub fn finite(value: f64) -> Self {
        Self::Finite(OrderedFloat(value))
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl std::fmt::Display for LikelihoodRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(v) => write!(f, "{:.4}", v.into_inner()),
            Self::Infinite => write!(f, "inf"),
        }
    }
}

/// JSON has no infinity; infinite ratios serialize as the string `"inf"`.
impl Serialize for LikelihoodRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(v) => serializer.serialize_f64(v.into_inner()),
            Self::Infinite => serializer.serialize_str("inf"),
        }
    }
}

/// Conditional probabilities of one vector. `None` means the vector was not
/// observed under that label, which is distinct from an observed zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VectorStats {
    /// P(vector | non-match)
    pub u: Option<f64>,
    /// P(vector | match)
    pub m: Option<f64>,
}

impl VectorStats {
    pub fn ratio(&self) -> LikelihoodRatio {
        match (self.m, self.u) {
            (_, Some(u)) if u > 0.0 => LikelihoodRatio::finite(self.m.unwrap_or(0.0) / u),
            (Some(m), _) if m > 0.0 => LikelihoodRatio::Infinite,
            _ => LikelihoodRatio::finite(0.0),
        }
    }

    pub fn u_mass(&self) -> f64 {
        self.u.unwrap_or(0.0)
    }

    pub fn m_mass(&self) -> f64 {
        self.m.unwrap_or(0.0)
    }
}

/// `u`, `m` and ratio for every vector observed in either training set.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityModel {
    pub(crate) stats: BTreeMap<ComparisonVector, VectorStats>,
}

impl ProbabilityModel {
    pub fn from_stats(stats: impl IntoIterator<Item = (ComparisonVector, VectorStats)>) -> Self {
        Self {
            stats: stats.into_iter().collect(),
        }
    }

    pub fn get(&self, vector: &ComparisonVector) -> Option<&VectorStats> {
        self.stats.get(vector)
    }

    pub fn contains(&self, vector: &ComparisonVector) -> bool {
        self.stats.contains_key(vector)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Vectors in their natural order.
    pub fn iter(&self) -> impl Iterator<Item = (&ComparisonVector, &VectorStats)> {
        self.stats.iter()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Match,
    Possible,
    NonMatch,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::Possible => write!(f, "possible"),
            Self::NonMatch => write!(f, "non_match"),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// One row of the evidence table: how a vector was scored and decided.
#[derive(Debug, Clone, Serialize)]
pub struct VectorEvidence {
    pub vector: ComparisonVector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub u: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<LikelihoodRatio>,
    pub decision: Disposition,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageSummary {
    pub candidate_pairs: usize,
    pub matches: usize,
    pub possibles: usize,
    pub nonmatches: usize,
    pub vector_space: usize,
    pub observed_vectors: usize,
    pub match_vectors: usize,
    pub possible_vectors: usize,
    pub nonmatch_vectors: usize,
    /// `u` mass assigned to the match set (bounded by `mu`).
    pub false_positive_mass: f64,
    /// `m` mass assigned to the non-match set (bounded by `lambda`).
    pub false_negative_mass: f64,
    pub training_matches: usize,
    pub training_nonmatches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub left_source: String,
    pub right_source: String,
    pub fields: Vec<String>,
    pub mu: f64,
    pub lambda: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_field: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageResult {
    pub meta: LinkageMeta,
    pub summary: LinkageSummary,
    pub evidence: Vec<VectorEvidence>,
    pub matches: Vec<RecordPair>,
    pub possibles: Vec<RecordPair>,
    pub nonmatches: Vec<RecordPair>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use SimilarityLevel::*;

    #[test]
    fn ratio_cases() {
        let both = VectorStats { u: Some(0.25), m: Some(0.5) };
        assert_eq!(both.ratio(), LikelihoodRatio::finite(2.0));

        let never_nonmatch = VectorStats { u: None, m: Some(0.1) };
        assert_eq!(never_nonmatch.ratio(), LikelihoodRatio::Infinite);

        let never_match = VectorStats { u: Some(0.3), m: None };
        assert_eq!(never_match.ratio(), LikelihoodRatio::finite(0.0));
    }

    #[test]
    fn infinite_sorts_above_finite() {
        assert!(LikelihoodRatio::Infinite > LikelihoodRatio::finite(1e300));
        assert!(LikelihoodRatio::finite(2.0) > LikelihoodRatio::finite(0.5));
    }

    #[test]
    fn ratio_serializes_inf_as_string() {
        assert_eq!(serde_json::to_string(&LikelihoodRatio::Infinite).unwrap(), r#""inf""#);
        assert_eq!(serde_json::to_string(&LikelihoodRatio::finite(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn frequency_table_tallies() {
        let a = ComparisonVector::new(vec![High, Low]);
        let b = ComparisonVector::new(vec![Low, Low]);
        let table: FrequencyTable = vec![a.clone(), b.clone(), a.clone()].into_iter().collect();
        assert_eq!(table.total(), 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&a), Some(2));
        assert_eq!(table.get(&ComparisonVector::new(vec![High, High])), None);
    }

    #[test]
    fn record_set_rejects_wrong_arity() {
        let mut set = RecordSet::new("left", vec!["name".into(), "city".into()], vec![]);
        assert_eq!(set.push(vec!["a".into(), "b".into()], vec![]).unwrap(), 0);
        assert!(set.push(vec!["a".into()], vec![]).is_err());
        assert_eq!(set.len(), 1);
        assert_eq!(set.field_index("city"), Some(1));
    }
}
