//! `vglink` commands: config-driven probabilistic record linkage.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

use visigrid_linkage::config::{BlockingConfig, Side, SourceConfig};
use visigrid_linkage::engine::{build_corpus, load_csv_records, load_known_links};
use visigrid_linkage::evidence::build_evidence;
use visigrid_linkage::model::VectorEvidence;
use visigrid_linkage::{
    partition, train, Disposition, LinkageConfig, LinkageInput, LinkageResult, RecordSet,
    VectorSpace,
};

use crate::exit_codes::{EXIT_ERROR, EXIT_LINK_POSSIBLES, EXIT_LINK_RUNTIME, EXIT_USAGE};
use crate::export;
use crate::CliError;

#[derive(Subcommand)]
pub enum LinkCommands {
    /// Train on known links and classify every candidate pair
    #[command(after_help = "\
Examples:
  vglink run restaurants.link.toml
  vglink run restaurants.link.toml --json
  vglink run restaurants.link.toml --output result.json --tables out/
  vglink run restaurants.link.toml --mu 0.01 --lambda 0.01
  vglink run restaurants.link.toml --block-on city --fail-on-possible")]
    Run {
        /// Path to the .link.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write matches.csv, possibles.csv and nonmatches.csv into this directory
        #[arg(long, value_name = "DIR")]
        tables: Option<PathBuf>,

        /// Override bounds.mu (tolerated false-match mass)
        #[arg(long)]
        mu: Option<f64>,

        /// Override bounds.lambda (tolerated false-non-match mass)
        #[arg(long)]
        lambda: Option<f64>,

        /// Only compare pairs that agree exactly on this comparable field
        #[arg(long, value_name = "FIELD", conflicts_with = "no_blocking")]
        block_on: Option<String>,

        /// Ignore [blocking] from the config and compare every pair
        #[arg(long)]
        no_blocking: bool,

        /// Exit with code 6 when any pair is left for clerical review
        #[arg(long)]
        fail_on_possible: bool,
    },

    /// Validate a link config without running
    #[command(after_help = "\
Examples:
  vglink validate restaurants.link.toml")]
    Validate {
        /// Path to the .link.toml config file
        config: PathBuf,
    },

    /// Train and partition only; print the per-vector evidence table
    #[command(after_help = "\
Examples:
  vglink model restaurants.link.toml
  vglink model restaurants.link.toml --json")]
    Model {
        /// Path to the .link.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_link(cmd: LinkCommands) -> Result<(), CliError> {
    match cmd {
        LinkCommands::Run {
            config,
            json,
            output,
            tables,
            mu,
            lambda,
            block_on,
            no_blocking,
            fail_on_possible,
        } => {
            let overrides = Overrides { mu, lambda, block_on, no_blocking };
            cmd_link_run(config, overrides, json, output, tables, fail_on_possible)
        }
        LinkCommands::Validate { config } => cmd_link_validate(config),
        LinkCommands::Model { config, json } => cmd_link_model(config, json),
    }
}

fn link_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

// ---------------------------------------------------------------------------
// Config + input loading
// ---------------------------------------------------------------------------

/// Command-line replacements for config values.
#[derive(Default)]
struct Overrides {
    mu: Option<f64>,
    lambda: Option<f64>,
    block_on: Option<String>,
    no_blocking: bool,
}

impl Overrides {
    fn apply(self, config: &mut LinkageConfig) {
        if let Some(mu) = self.mu {
            config.bounds.mu = mu;
        }
        if let Some(lambda) = self.lambda {
            config.bounds.lambda = lambda;
        }
        if self.no_blocking {
            config.blocking = None;
        } else if let Some(field) = self.block_on {
            config.blocking = Some(BlockingConfig { field });
        }
    }
}

/// Read and validate the config, applying overrides before validation so
/// they are held to the same rules as the file.
fn load_config(path: &Path, overrides: Overrides) -> Result<LinkageConfig, CliError> {
    if !path.is_file() {
        return Err(link_err(EXIT_USAGE, format!("config file not found: {}", path.display())));
    }
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| link_err(EXIT_LINK_RUNTIME, format!("cannot read config: {e}")))?;

    let mut config = LinkageConfig::from_toml(&config_str).map_err(CliError::linkage)?;
    overrides.apply(&mut config);
    config.validate().map_err(CliError::linkage)?;
    Ok(config)
}

fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| link_err(EXIT_LINK_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

/// Load both sources and the known links, resolving paths relative to the
/// config file's directory.
fn load_input(config: &LinkageConfig, base_dir: &Path) -> Result<LinkageInput, CliError> {
    let load = |name: &str, source: &SourceConfig, side: Side| -> Result<RecordSet, CliError> {
        let csv_data = read_file(&base_dir.join(&source.file))?;
        let set = load_csv_records(name, &csv_data, source, &config.fields, side)
            .map_err(CliError::linkage)?;
        log::info!("source '{}': {} record(s)", name, set.len());
        Ok(set)
    };
    let left = load(config.left_name(), &config.sources.left, Side::Left)?;
    let right = load(config.right_name(), &config.sources.right, Side::Right)?;

    let links_data = read_file(&base_dir.join(&config.training.known_links))?;
    let known_links =
        load_known_links(&links_data, left.len(), right.len()).map_err(CliError::linkage)?;

    Ok(LinkageInput { left, right, known_links })
}

fn write_json<T: Serialize>(value: &T, json_output: bool, output_file: Option<&Path>) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| link_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| link_err(EXIT_LINK_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn cmd_link_run(
    config_path: PathBuf,
    overrides: Overrides,
    json_output: bool,
    output_file: Option<PathBuf>,
    tables_dir: Option<PathBuf>,
    fail_on_possible: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path, overrides)?;
    let base = base_dir(&config_path);
    let input = load_input(&config, base)?;

    let result = visigrid_linkage::run(&config, &input).map_err(CliError::linkage)?;

    // Flags win; otherwise [output] paths resolve against the config's directory.
    let output_file = output_file.or_else(|| config.output.json.as_ref().map(|p| base.join(p)));
    let tables_dir = tables_dir.or_else(|| config.output.tables_dir.as_ref().map(|p| base.join(p)));

    write_json(&result, json_output, output_file.as_deref())?;

    if let Some(ref dir) = tables_dir {
        let written = export::write_tables(
            dir,
            &input.left,
            &input.right,
            [
                (Disposition::Match, result.matches.as_slice()),
                (Disposition::Possible, result.possibles.as_slice()),
                (Disposition::NonMatch, result.nonmatches.as_slice()),
            ],
        )
        .map_err(|e| link_err(EXIT_LINK_RUNTIME, e))?;
        for path in written {
            eprintln!("wrote {}", path.display());
        }
    }

    print_summary(&result);

    if fail_on_possible && result.summary.possibles > 0 {
        return Err(link_err(
            EXIT_LINK_POSSIBLES,
            format!("{} pair(s) need clerical review", result.summary.possibles),
        ));
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &LinkageResult) {
    let s = &result.summary;
    eprintln!(
        "linkage '{}': {} candidate pair(s): {} match, {} possible, {} non-match",
        result.meta.config_name, s.candidate_pairs, s.matches, s.possibles, s.nonmatches,
    );
    eprintln!(
        "vectors: {} of {} observed; {} match, {} possible, {} non-match",
        s.observed_vectors, s.vector_space, s.match_vectors, s.possible_vectors, s.nonmatch_vectors,
    );
    eprintln!(
        "error mass: false positive {:.6} (mu {}), false negative {:.6} (lambda {})",
        s.false_positive_mass, result.meta.mu, s.false_negative_mass, result.meta.lambda,
    );
    if let Some(ref field) = result.meta.blocking_field {
        eprintln!("blocking on '{field}'");
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn cmd_link_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path, Overrides::default())?;
    eprintln!(
        "valid: linkage '{}' of '{}' and '{}' on {} field(s) [{}]",
        config.name,
        config.left_name(),
        config.right_name(),
        config.fields.len(),
        config.field_names().join(", "),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// model
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ModelReport<'a> {
    config_name: &'a str,
    fields: Vec<String>,
    mu: f64,
    lambda: f64,
    false_positive_mass: f64,
    false_negative_mass: f64,
    evidence: Vec<VectorEvidence>,
}

fn cmd_link_model(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = load_config(&config_path, Overrides::default())?;
    let input = load_input(&config, base_dir(&config_path))?;

    let quantizer = config.similarity.quantizer().map_err(CliError::linkage)?;
    let corpus = build_corpus(&config, &input);
    let model = train(&quantizer, &input.left, &input.right, &corpus).map_err(CliError::linkage)?;
    let space = VectorSpace::new(config.fields.len());
    let decisions = partition(&model, space, config.bounds.mu, config.bounds.lambda)
        .map_err(CliError::linkage)?;

    let report = ModelReport {
        config_name: &config.name,
        fields: config.field_names(),
        mu: config.bounds.mu,
        lambda: config.bounds.lambda,
        false_positive_mass: decisions.false_positive_mass,
        false_negative_mass: decisions.false_negative_mass,
        evidence: build_evidence(&model, &decisions, space),
    };

    if json_output {
        return write_json(&report, true, None);
    }

    print_evidence(&report);
    Ok(())
}

fn fmt_prob(p: Option<f64>) -> String {
    p.map(|v| format!("{v:.6}")).unwrap_or_else(|| "-".into())
}

fn print_evidence(report: &ModelReport<'_>) {
    let rows: Vec<[String; 5]> = report
        .evidence
        .iter()
        .map(|e| {
            [
                e.vector.to_string(),
                fmt_prob(e.u),
                fmt_prob(e.m),
                e.ratio.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
                e.decision.to_string(),
            ]
        })
        .collect();

    let header = ["vector", "u", "m", "m/u", "decision"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    println!("fields: {}", report.fields.join(", "));
    println!(
        "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}  {}",
        header[0], header[1], header[2], header[3], header[4],
        w0 = widths[0], w1 = widths[1], w2 = widths[2], w3 = widths[3],
    );
    for row in &rows {
        println!(
            "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}  {}",
            row[0], row[1], row[2], row[3], row[4],
            w0 = widths[0], w1 = widths[1], w2 = widths[2], w3 = widths[3],
        );
    }
    eprintln!(
        "error mass: false positive {:.6} (mu {}), false negative {:.6} (lambda {})",
        report.false_positive_mass, report.mu, report.false_negative_mass, report.lambda,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
name = "t"

[sources.left]
file = "a.csv"

[sources.right]
file = "b.csv"

[[fields]]
name = "name"

[[fields]]
name = "city"

[bounds]
mu = 0.01
lambda = 0.02

[training]
known_links = "links.csv"

[blocking]
field = "city"
"#;

    #[test]
    fn overrides_replace_config_values() {
        let mut config = LinkageConfig::from_toml(CONFIG).unwrap();
        Overrides { mu: Some(0.5), lambda: None, block_on: Some("name".into()), no_blocking: false }
            .apply(&mut config);
        assert_eq!(config.bounds.mu, 0.5);
        assert_eq!(config.bounds.lambda, 0.02);
        assert_eq!(config.blocking_field(), Some("name"));
    }

    #[test]
    fn no_blocking_clears_config_blocking() {
        let mut config = LinkageConfig::from_toml(CONFIG).unwrap();
        Overrides { no_blocking: true, ..Default::default() }.apply(&mut config);
        assert!(config.blocking_field().is_none());
    }

    #[test]
    fn overridden_bounds_are_validated() {
        let mut config = LinkageConfig::from_toml(CONFIG).unwrap();
        Overrides { lambda: Some(-0.1), ..Default::default() }.apply(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_probability_prints_dash() {
        assert_eq!(fmt_prob(None), "-");
        assert_eq!(fmt_prob(Some(0.5)), "0.500000");
    }
}
