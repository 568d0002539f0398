//! `visigrid-linkage`: Fellegi-Sunter probabilistic record linkage.
//!
//! Pure engine crate: receives pre-loaded records from two sources, learns
//! match / non-match vector probabilities from a labeled corpus, and routes
//! every candidate pair to match, possible match, or non-match.
//! No CLI dependencies.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod evidence;
pub mod model;
pub mod partition;
pub mod sample;
pub mod similarity;
pub mod vector;

pub use classify::{classify, Classification};
pub use config::LinkageConfig;
pub use engine::{link, run, LinkageInput, LinkageOutcome, LinkageParams};
pub use error::LinkageError;
pub use estimate::{estimate, train};
pub use model::{Disposition, LinkageResult, ProbabilityModel, Record, RecordPair, RecordSet, TrainingCorpus};
pub use partition::{partition, DecisionSets};
pub use similarity::{Quantizer, SimilarityLevel};
pub use vector::{build_vector, ComparisonVector, VectorSpace};
