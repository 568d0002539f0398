use std::collections::HashSet;

use crate::classify::{classify, Classification};
use crate::config::{FieldConfig, LinkageConfig, Side, SourceConfig};
use crate::error::LinkageError;
use crate::estimate::train;
use crate::evidence::{build_evidence, compute_summary};
use crate::model::{
    LinkageMeta, LinkageResult, ProbabilityModel, RecordPair, RecordSet, TrainingCorpus,
};
use crate::partition::{partition, validate_bound, DecisionSets};
use crate::sample::sample_presumed_nonmatches;
use crate::similarity::Quantizer;
use crate::vector::VectorSpace;

/// Pre-loaded sources plus the verified links between them.
pub struct LinkageInput {
    pub left: RecordSet,
    pub right: RecordSet,
    pub known_links: Vec<RecordPair>,
}

/// Knobs for one linkage run.
#[derive(Debug, Clone, Copy)]
pub struct LinkageParams<'a> {
    pub quantizer: Quantizer,
    pub mu: f64,
    pub lambda: f64,
    pub blocking_field: Option<&'a str>,
}

/// Everything a linkage run derives, from model to final routing.
#[derive(Debug, Clone)]
pub struct LinkageOutcome {
    pub space: VectorSpace,
    pub model: ProbabilityModel,
    pub decisions: DecisionSets,
    pub classification: Classification,
}

/// Train, partition and classify in one pass.
///
/// Fails before doing any work if the bounds are invalid or the sources
/// disagree on their comparable fields; no partial output is produced.
pub fn link(
    left: &RecordSet,
    right: &RecordSet,
    corpus: &TrainingCorpus,
    params: &LinkageParams<'_>,
) -> Result<LinkageOutcome, LinkageError> {
    validate_bound("mu", params.mu)?;
    validate_bound("lambda", params.lambda)?;
    left.check_compatible(right)?;
    let space = VectorSpace::new(left.fields.len());
    if space.size().is_none() {
        return Err(LinkageError::ConfigValidation(format!(
            "{} comparable fields is too many to enumerate",
            space.width()
        )));
    }

    let model = train(&params.quantizer, left, right, corpus)?;
    let decisions = partition(&model, space, params.mu, params.lambda)?;
    let classification = classify(&params.quantizer, left, right, &decisions, params.blocking_field)?;

    Ok(LinkageOutcome {
        space,
        model,
        decisions,
        classification,
    })
}

/// Known links plus a seeded sample of presumed non-matches.
pub fn build_corpus(config: &LinkageConfig, input: &LinkageInput) -> TrainingCorpus {
    let distinct: HashSet<&RecordPair> = input.known_links.iter().collect();
    if distinct.len() != input.known_links.len() {
        log::warn!(
            "{} duplicate known link(s); duplicates are counted as separate observations",
            input.known_links.len() - distinct.len()
        );
    }

    let presumed_nonmatches = sample_presumed_nonmatches(
        input.left.len(),
        input.right.len(),
        config.training.sample_size,
        config.training.left_seed,
        config.training.right_seed,
    );
    log::info!(
        "training on {} known match(es) and {} presumed non-match(es)",
        input.known_links.len(),
        presumed_nonmatches.len()
    );

    TrainingCorpus {
        known_matches: input.known_links.clone(),
        presumed_nonmatches,
    }
}

/// Run linkage per config. Samples presumed non-matches, links, and assembles
/// the serializable result.
pub fn run(config: &LinkageConfig, input: &LinkageInput) -> Result<LinkageResult, LinkageError> {
    let quantizer = config.similarity.quantizer()?;

    let corpus = build_corpus(config, input);

    let params = LinkageParams {
        quantizer,
        mu: config.bounds.mu,
        lambda: config.bounds.lambda,
        blocking_field: config.blocking_field(),
    };
    let outcome = link(&input.left, &input.right, &corpus, &params)?;

    let evidence = build_evidence(&outcome.model, &outcome.decisions, outcome.space);
    let summary = compute_summary(&outcome, &corpus);
    let Classification {
        matches,
        possibles,
        nonmatches,
    } = outcome.classification;

    Ok(LinkageResult {
        meta: LinkageMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            left_source: input.left.source.clone(),
            right_source: input.right.source.clone(),
            fields: input.left.fields.clone(),
            mu: config.bounds.mu,
            lambda: config.bounds.lambda,
            blocking_field: config.blocking_field().map(String::from),
        },
        summary,
        evidence,
        matches,
        possibles,
        nonmatches,
    })
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load CSV rows into a RecordSet, projecting each row onto the comparable
/// fields in config order. Short rows read their missing cells as empty.
pub fn load_csv_records(
    source_name: &str,
    csv_data: &str,
    source_config: &SourceConfig,
    fields: &[FieldConfig],
    side: Side,
) -> Result<RecordSet, LinkageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(source_config.columns.is_none())
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let columns: Vec<String> = match source_config.columns {
        Some(ref columns) => columns.clone(),
        None => reader
            .headers()
            .map_err(|e| LinkageError::Io(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
    };

    let field_idx: Vec<usize> = fields
        .iter()
        .map(|f| {
            let column = side.column(f);
            columns.iter().position(|c| c == column).ok_or_else(|| {
                LinkageError::MissingColumn {
                    source: source_name.into(),
                    column: column.into(),
                }
            })
        })
        .collect::<Result<_, _>>()?;

    let mut set = RecordSet::new(
        source_name,
        fields.iter().map(|f| f.name.clone()).collect(),
        columns.clone(),
    );

    for record in reader.records() {
        let record = record.map_err(|e| LinkageError::Io(e.to_string()))?;
        let raw: Vec<String> = (0..columns.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        let values = field_idx.iter().map(|&i| raw[i].clone()).collect();
        set.push(values, raw)?;
    }

    log::debug!("loaded {} record(s) from source '{source_name}'", set.len());
    Ok(set)
}

/// Load headerless `left_index,right_index` rows, checking each index against
/// the loaded source sizes.
pub fn load_known_links(
    csv_data: &str,
    left_len: usize,
    right_len: usize,
) -> Result<Vec<RecordPair>, LinkageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let mut links = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| LinkageError::Io(e.to_string()))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(i + 1);

        let parse = |cell: Option<&str>| -> Result<usize, LinkageError> {
            let value = cell.unwrap_or("").trim();
            value.parse().map_err(|_| LinkageError::LinkParse {
                line,
                value: value.into(),
            })
        };
        let left = parse(record.get(0))?;
        let right = parse(record.get(1))?;

        if left >= left_len || right >= right_len {
            return Err(LinkageError::LinkOutOfRange { line, left, right });
        }
        links.push(RecordPair::new(left, right));
    }

    Ok(links)
}
