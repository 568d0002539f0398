// VisiGrid linkage CLI - Fellegi-Sunter record linkage over two CSV sources

mod exit_codes;
mod export;
mod link;
mod logger;

use std::process::ExitCode;

use clap::Parser;

use exit_codes::{linkage_exit_code, EXIT_SUCCESS};
use link::LinkCommands;
use visigrid_linkage::LinkageError;

#[derive(Parser)]
#[command(name = "vglink")]
#[command(about = "Probabilistic record linkage between two CSV sources")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: LinkCommands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(logger::level_for(cli.verbose, cli.quiet));

    match link::cmd_link(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Create error from an engine error with the proper exit code.
    pub fn linkage(err: LinkageError) -> Self {
        let code = linkage_exit_code(&err);
        let hint = match &err {
            LinkageError::BoundOutOfRange { .. } => {
                Some("mu and lambda are probability masses in [0, 1]".to_string())
            }
            LinkageError::EmptyTrainingSet { label } if *label == "known match" => {
                Some("training.known_links must list at least one left_index,right_index row".to_string())
            }
            LinkageError::EmptyTrainingSet { .. } => {
                Some("both sources need at least one record to sample non-matches".to_string())
            }
            LinkageError::LinkOutOfRange { .. } => {
                Some("known link indices are zero-based record positions".to_string())
            }
            LinkageError::UnknownField(_) => {
                Some("blocking.field must be the name of a [[fields]] entry".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}
