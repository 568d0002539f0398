//! Field-level similarity quantization.
//!
//! A pair of raw field values is scored with Jaro-Winkler similarity (which
//! rewards a shared prefix) and bucketed into one of three ordered levels.

use serde::{Deserialize, Serialize};

use crate::error::LinkageError;

/// Default lower bound (inclusive) of the `high` bucket.
pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.9;
/// Default lower bound (inclusive) of the `medium` bucket.
pub const DEFAULT_MEDIUM_THRESHOLD: f64 = 0.75;

/// Categorical similarity of two field values. Ordered from most to least similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityLevel {
    High,
    Medium,
    Low,
}

impl SimilarityLevel {
    /// All levels, in radix-digit order used by vector enumeration.
    pub const ALL: [SimilarityLevel; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for SimilarityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buckets a Jaro-Winkler score against two fixed cut points.
///
/// `score >= high` is [`SimilarityLevel::High`], `score >= medium` is
/// [`SimilarityLevel::Medium`], anything below is [`SimilarityLevel::Low`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    high: f64,
    medium: f64,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self {
            high: DEFAULT_HIGH_THRESHOLD,
            medium: DEFAULT_MEDIUM_THRESHOLD,
        }
    }
}

impl Quantizer {
    pub fn new(high: f64, medium: f64) -> Result<Self, LinkageError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(high) || !in_unit(medium) || medium > high {
            return Err(LinkageError::ConfigValidation(format!(
                "similarity thresholds must satisfy 0 <= medium <= high <= 1, got high={high}, medium={medium}"
            )));
        }
        Ok(Self { high, medium })
    }

    /// Raw similarity score in `[0, 1]`. A missing value on either side
    /// scores 0.0, so two blank fields never count as agreement.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        strsim::jaro_winkler(a, b)
    }

    pub fn quantize(&self, a: &str, b: &str) -> SimilarityLevel {
        self.bucket(self.score(a, b))
    }

    pub fn bucket(&self, score: f64) -> SimilarityLevel {
        if score >= self.high {
            SimilarityLevel::High
        } else if score >= self.medium {
            SimilarityLevel::Medium
        } else {
            SimilarityLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names_are_high() {
        let q = Quantizer::default();
        assert_eq!(q.quantize("smith", "smith"), SimilarityLevel::High);
    }

    #[test]
    fn unrelated_names_are_low() {
        let q = Quantizer::default();
        assert_eq!(q.quantize("smith", "jones"), SimilarityLevel::Low);
    }

    #[test]
    fn near_miss_is_medium() {
        // jaro-winkler("dwayne", "duane") = 0.84
        let q = Quantizer::default();
        assert_eq!(q.quantize("dwayne", "duane"), SimilarityLevel::Medium);
    }

    #[test]
    fn empty_values_are_defined() {
        let q = Quantizer::default();
        assert_eq!(q.quantize("", "smith"), SimilarityLevel::Low);
        assert_eq!(q.quantize("smith", ""), SimilarityLevel::Low);
        // Both missing is not evidence of a match.
        assert_eq!(q.score("", ""), 0.0);
        assert_eq!(q.quantize("", ""), SimilarityLevel::Low);
    }

    #[test]
    fn bucket_edges_are_inclusive() {
        let q = Quantizer::new(0.9, 0.8).unwrap();
        assert_eq!(q.bucket(0.9), SimilarityLevel::High);
        assert_eq!(q.bucket(0.8999), SimilarityLevel::Medium);
        assert_eq!(q.bucket(0.8), SimilarityLevel::Medium);
        assert_eq!(q.bucket(0.7999), SimilarityLevel::Low);
    }

    #[test]
    fn reject_inverted_thresholds() {
        assert!(Quantizer::new(0.5, 0.8).is_err());
        assert!(Quantizer::new(1.2, 0.8).is_err());
        assert!(Quantizer::new(0.9, -0.1).is_err());
    }

    #[test]
    fn levels_are_ordered_most_similar_first() {
        assert!(SimilarityLevel::High < SimilarityLevel::Medium);
        assert!(SimilarityLevel::Medium < SimilarityLevel::Low);
        assert_eq!(SimilarityLevel::Medium.to_string(), "medium");
    }
}
