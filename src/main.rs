use clap::{Parser, Subcommand};
use form_intake::cli;
use form_intake::error::IntakeResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Spreadsheet form intake: classify, extract, record, archive.")]
#[command(long_about = "Intake - Spreadsheet form processing pipeline

Classifies emailed spreadsheet forms into known layouts, extracts header
and line-item data by fixed cell coordinates, dedupes against the ledger,
records one row per line item, and archives the original file.

COMMANDS:
  run    - Process every pending form submission in the inbox
  parse  - Parse a single form file and print the extraction

LOCAL MODE:
  The run command works against local collaborators: a drop-folder inbox,
  a JSON-lines ledger, a directory-tree archive and a text-file outbox.
  Processed files are moved into a per-label subdirectory of the inbox,
  which is what keeps them out of the next run.

EXAMPLES:
  intake run                         # defaults: ./inbox, ./ledger.jsonl
  intake run -c intake.yaml -v       # explicit config, verbose
  intake parse form.xlsx             # inspect one form
  intake parse form.xlsx --json      # machine-readable extraction

Set RUST_LOG (e.g. RUST_LOG=form_intake=debug) for structured logs.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every pending form submission in the inbox
    Run {
        /// Path to a YAML configuration file (defaults apply when omitted)
        #[arg(short, long, env = "INTAKE_CONFIG")]
        config: Option<PathBuf>,

        /// Show the effective run configuration
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse a single form spreadsheet and print the extraction
    Parse {
        /// Path to the form file (.xlsx)
        file: PathBuf,

        /// Print the parsed submission as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> IntakeResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "form_intake=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, verbose } => {
            let summary = cli::run(config, verbose)?;
            if summary.failures > 0 {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Parse { file, json } => cli::parse(file, json),
    }
}
