use std::collections::HashSet;

use serde::Deserialize;

use crate::error::LinkageError;
use crate::partition::validate_bound;
use crate::similarity::{Quantizer, DEFAULT_HIGH_THRESHOLD, DEFAULT_MEDIUM_THRESHOLD};

/// Upper limit on comparable fields; the vector space grows as 3^k.
pub const MAX_FIELDS: usize = 12;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LinkageConfig {
    pub name: String,
    pub sources: SourcesConfig,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    pub bounds: BoundsConfig,
    pub training: TrainingConfig,
    #[serde(default)]
    pub blocking: Option<BlockingConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub left: SourceConfig,
    pub right: SourceConfig,
}

/// One input CSV.
///
/// With `columns` set the file is read headerless and the columns are named
/// in order; without it the first row is the header.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub file: String,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl SourceConfig {
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A comparable field and the column that carries it in each source.
/// Column names default to the field name.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub left: Option<String>,
    #[serde(default)]
    pub right: Option<String>,
}

impl FieldConfig {
    pub fn left_column(&self) -> &str {
        self.left.as_deref().unwrap_or(&self.name)
    }

    pub fn right_column(&self) -> &str {
        self.right.as_deref().unwrap_or(&self.name)
    }
}

/// Which source a column mapping refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn column<'a>(&self, field: &'a FieldConfig) -> &'a str {
        match self {
            Self::Left => field.left_column(),
            Self::Right => field.right_column(),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

// ---------------------------------------------------------------------------
// Similarity + Bounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityConfig {
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
}

fn default_high() -> f64 {
    DEFAULT_HIGH_THRESHOLD
}

fn default_medium() -> f64 {
    DEFAULT_MEDIUM_THRESHOLD
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
        }
    }
}

impl SimilarityConfig {
    pub fn quantizer(&self) -> Result<Quantizer, LinkageError> {
        Quantizer::new(self.high, self.medium)
    }
}

/// Error-rate ceilings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundsConfig {
    /// Max false-positive mass (non-matches called matches).
    pub mu: f64,
    /// Max false-negative mass (matches called non-matches).
    pub lambda: f64,
}

// ---------------------------------------------------------------------------
// Training + Blocking + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Headerless CSV of `left_index,right_index` pairs known to match.
    pub known_links: String,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_left_seed")]
    pub left_seed: u64,
    #[serde(default = "default_right_seed")]
    pub right_seed: u64,
}

fn default_sample_size() -> usize {
    1000
}

fn default_left_seed() -> u64 {
    1234
}

fn default_right_seed() -> u64 {
    5678
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockingConfig {
    pub field: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    /// Directory for the joined matches / possibles / nonmatches CSV tables.
    #[serde(default)]
    pub tables_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkageConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: LinkageConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        if self.fields.is_empty() {
            return Err(LinkageError::ConfigValidation(
                "at least one comparable field is required".into(),
            ));
        }
        if self.fields.len() > MAX_FIELDS {
            return Err(LinkageError::ConfigValidation(format!(
                "at most {MAX_FIELDS} comparable fields are supported, got {}",
                self.fields.len()
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(LinkageError::ConfigValidation("field name cannot be empty".into()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(LinkageError::ConfigValidation(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
        }

        self.similarity.quantizer()?;
        validate_bound("mu", self.bounds.mu)?;
        validate_bound("lambda", self.bounds.lambda)?;

        if self.training.sample_size == 0 {
            return Err(LinkageError::ConfigValidation(
                "training.sample_size must be at least 1".into(),
            ));
        }

        if let Some(ref blocking) = self.blocking {
            if !self.fields.iter().any(|f| f.name == blocking.field) {
                return Err(LinkageError::UnknownField(blocking.field.clone()));
            }
        }

        Ok(())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn left_name(&self) -> &str {
        self.sources.left.display_name("left")
    }

    pub fn right_name(&self) -> &str {
        self.sources.right.display_name("right")
    }

    pub fn blocking_field(&self) -> Option<&str> {
        self.blocking.as_ref().map(|b| b.field.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
