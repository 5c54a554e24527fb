use crate::cli::commands::{open_store, print_json, ScopeArgs};
use crate::config::Config;
use crate::tsv::{receive, Ingest, IngestOverrides};
use chrono::NaiveDate;
use clap::Args;
use colored::*;
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Repertoire name to store the file under
    #[arg(short, long)]
    pub name: String,

    /// Input TSV file
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Override the input cell count
    #[arg(long)]
    pub cells: Option<u64>,

    /// Sample volume in milliliters (marks the sample cell-free)
    #[arg(long)]
    pub milliliters: Option<f64>,

    /// Sample date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

pub fn run(args: IngestArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(&args.scope.store, config)?;
    let spec = crate::store::RepertoireSpec::new(&args.scope.user, &args.scope.context, &args.name);

    let overrides = IngestOverrides {
        total_cells: args.cells,
        milliliters: args.milliliters,
        date: args.date,
    };

    let input = File::open(&args.input)?;
    match receive(&store, &spec, input, &overrides)? {
        Ingest::Ok(rep) => print_json(&rep),
        Ingest::Exists => {
            eprintln!(
                "{} repertoire {} already exists, nothing ingested",
                "Skipped:".yellow().bold(),
                spec
            );
            Ok(())
        }
    }
}
