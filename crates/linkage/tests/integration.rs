use std::collections::BTreeSet;
use std::path::PathBuf;

use visigrid_linkage::config::{LinkageConfig, Side};
use visigrid_linkage::engine::{link, load_csv_records, load_known_links, run, LinkageInput, LinkageParams};
use visigrid_linkage::model::{Disposition, LinkageResult, RecordPair, RecordSet, TrainingCorpus};
use visigrid_linkage::{LinkageError, Quantizer};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config() -> LinkageConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("restaurants.link.toml")).unwrap();
    LinkageConfig::from_toml(&toml).unwrap()
}

fn load_input(config: &LinkageConfig) -> LinkageInput {
    let dir = fixtures_dir();
    let read = |file: &str| {
        std::fs::read_to_string(dir.join(file))
            .unwrap_or_else(|e| panic!("cannot read {file}: {e}"))
    };
    let left = load_csv_records(
        config.left_name(),
        &read(&config.sources.left.file),
        &config.sources.left,
        &config.fields,
        Side::Left,
    )
    .unwrap();
    let right = load_csv_records(
        config.right_name(),
        &read(&config.sources.right.file),
        &config.sources.right,
        &config.fields,
        Side::Right,
    )
    .unwrap();
    let known_links = load_known_links(&read(&config.training.known_links), left.len(), right.len()).unwrap();
    LinkageInput { left, right, known_links }
}

fn load_and_run(config: &LinkageConfig) -> LinkageResult {
    let input = load_input(config);
    run(config, &input).unwrap()
}

fn all_pairs(result: &LinkageResult) -> Vec<RecordPair> {
    result
        .matches
        .iter()
        .chain(&result.possibles)
        .chain(&result.nonmatches)
        .copied()
        .collect()
}

// -------------------------------------------------------------------------
// Full runs
// -------------------------------------------------------------------------

#[test]
fn fixture_run_routes_every_pair_once() {
    let config = fixture_config();
    let result = load_and_run(&config);

    assert_eq!(result.meta.left_source, "zagat");
    assert_eq!(result.meta.right_source, "fodors");
    assert_eq!(result.summary.training_matches, 16);
    assert_eq!(result.summary.training_nonmatches, 1000);

    let pairs = all_pairs(&result);
    assert_eq!(pairs.len(), 25 * 27);
    assert_eq!(result.summary.candidate_pairs, 25 * 27);
    let unique: BTreeSet<_> = pairs.iter().collect();
    assert_eq!(unique.len(), pairs.len(), "a pair was routed twice");
}

#[test]
fn fixture_run_respects_error_bounds() {
    let config = fixture_config();
    let result = load_and_run(&config);
    let s = &result.summary;

    assert_eq!(s.vector_space, 27);
    assert_eq!(s.match_vectors + s.possible_vectors + s.nonmatch_vectors, 27);
    assert!(s.false_positive_mass <= config.bounds.mu + 1e-9);
    assert!(s.false_negative_mass <= config.bounds.lambda + 1e-9);

    let fp: f64 = result
        .evidence
        .iter()
        .filter(|e| e.decision == Disposition::Match)
        .filter_map(|e| e.u)
        .sum();
    assert!((fp - s.false_positive_mass).abs() < 1e-9);
}

#[test]
fn fixture_run_is_reproducible() {
    let config = fixture_config();
    let a = load_and_run(&config);
    let b = load_and_run(&config);
    assert_eq!(a.matches, b.matches);
    assert_eq!(a.possibles, b.possibles);
    assert_eq!(a.nonmatches, b.nonmatches);
}

#[test]
fn unseen_vectors_need_review() {
    let config = fixture_config();
    let result = load_and_run(&config);
    for e in &result.evidence {
        if e.u.is_none() && e.m.is_none() {
            assert_eq!(e.decision, Disposition::Possible, "unseen {} was decided", e.vector);
        }
    }
}

#[test]
fn mu_one_matches_identical_rows() {
    let mut config = fixture_config();
    config.bounds.mu = 1.0;
    config.validate().unwrap();
    let result = load_and_run(&config);
    // Citrus and Patina appear verbatim in both sources.
    assert!(result.matches.contains(&RecordPair::new(6, 6)));
    assert!(result.matches.contains(&RecordPair::new(16, 16)));
}

#[test]
fn raising_mu_never_shrinks_matches() {
    let mut previous: Option<BTreeSet<RecordPair>> = None;
    for mu in [0.0, 0.001, 0.005, 0.05, 0.2, 0.6, 1.0] {
        let mut config = fixture_config();
        config.bounds.mu = mu;
        let result = load_and_run(&config);
        let current: BTreeSet<_> = result.matches.iter().copied().collect();
        if let Some(prev) = previous {
            assert!(prev.is_subset(&current), "match set shrank at mu={mu}");
        }
        previous = Some(current);
    }
}

#[test]
fn raising_lambda_never_shrinks_nonmatches() {
    let mut previous: Option<BTreeSet<RecordPair>> = None;
    for lambda in [0.0, 0.001, 0.05, 0.3, 1.0] {
        let mut config = fixture_config();
        config.bounds.lambda = lambda;
        let result = load_and_run(&config);
        let current: BTreeSet<_> = result.nonmatches.iter().copied().collect();
        if let Some(prev) = previous {
            assert!(prev.is_subset(&current), "non-match set shrank at lambda={lambda}");
        }
        previous = Some(current);
    }
}

#[test]
fn blocking_on_city_only_pairs_equal_cities() {
    let mut config = fixture_config();
    config.blocking = Some(visigrid_linkage::config::BlockingConfig { field: "city".into() });
    config.validate().unwrap();

    let input = load_input(&config);
    let expected = input
        .left
        .records
        .iter()
        .flat_map(|a| input.right.records.iter().map(move |b| (a, b)))
        .filter(|(a, b)| a.values[1] == b.values[1])
        .count();

    let result = run(&config, &input).unwrap();
    let pairs = all_pairs(&result);
    assert_eq!(pairs.len(), expected);
    for p in pairs {
        assert_eq!(input.left.records[p.left].values[1], input.right.records[p.right].values[1]);
    }
}

// -------------------------------------------------------------------------
// Hand-built corpus
// -------------------------------------------------------------------------

#[test]
fn explicit_corpus_matches_verbatim_rows() {
    let config = fixture_config();
    let input = load_input(&config);

    // Shifted pairs are different restaurants.
    let presumed_nonmatches = (0..input.left.len())
        .map(|i| RecordPair::new(i, (i + 7) % input.right.len()))
        .collect();
    let corpus = TrainingCorpus {
        known_matches: input.known_links.clone(),
        presumed_nonmatches,
    };
    let params = LinkageParams {
        quantizer: Quantizer::default(),
        mu: 0.005,
        lambda: 0.005,
        blocking_field: None,
    };
    let outcome = link(&input.left, &input.right, &corpus, &params).unwrap();

    // (high, high, high) never occurs among the shifted pairs: infinite ratio.
    assert!(outcome.classification.matches.contains(&RecordPair::new(0, 0)));
    assert!(outcome.classification.matches.contains(&RecordPair::new(6, 6)));
    assert_eq!(outcome.decisions.len(), 27);
}

// -------------------------------------------------------------------------
// Failures
// -------------------------------------------------------------------------

#[test]
fn empty_known_links_is_fatal() {
    let config = fixture_config();
    let mut input = load_input(&config);
    input.known_links.clear();
    let err = run(&config, &input).unwrap_err();
    assert!(err.is_training());
    assert!(err.to_string().contains("known match"));
}

#[test]
fn empty_source_is_fatal() {
    let config = fixture_config();
    let mut input = load_input(&config);
    input.right = RecordSet::new("fodors", input.right.fields.clone(), input.right.columns.clone());
    input.known_links.clear();
    input.known_links.push(RecordPair::new(0, 0));
    // The link now points nowhere, and the sampler has nothing to draw from.
    let err = run(&config, &input).unwrap_err();
    assert!(matches!(err, LinkageError::LinkOutOfRange { .. } | LinkageError::EmptyTrainingSet { .. }));
}

#[test]
fn schema_mismatch_is_fatal() {
    let config = fixture_config();
    let mut input = load_input(&config);
    input.right = RecordSet::from_rows("fodors", &["name", "city"], vec![vec!["Spago", "Los Angeles"]]).unwrap();
    input.known_links = vec![RecordPair::new(0, 0)];
    let err = run(&config, &input).unwrap_err();
    assert!(matches!(err, LinkageError::SchemaMismatch { left: 3, right: 2 }));
}
