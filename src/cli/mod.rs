pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "clonescan",
    version,
    about = "Immune-receptor repertoire analysis",
    long_about = "Clonescan ingests immune-receptor repertoire TSV files into a local store and \
                  runs streaming analyses over them: clone overlap between samples, fuzzy motif \
                  search, top-clone ranking, V/J gene usage, and longitudinal MRD tracking."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a repertoire TSV file into the store
    Ingest(commands::ingest::IngestArgs),

    /// List contexts for a user, or repertoires in a context
    List(commands::list::ListArgs),

    /// Fuzzy motif search across repertoires
    Search(commands::search::SearchArgs),

    /// Clone overlap between repertoires
    Overlap(commands::overlap::OverlapArgs),

    /// Top-ranked clones per repertoire
    Top(commands::top::TopArgs),

    /// V/J gene usage for one repertoire
    Genes(commands::genes::GenesArgs),

    /// Track target clones across repertoires over time
    Track(commands::track::TrackArgs),

    /// Delete a repertoire and its cache files
    Rm(commands::rm::RmArgs),

    /// Copy a repertoire to another user, context, or name
    Cp(commands::admin::CpArgs),

    /// Move a repertoire to another user, context, or name
    Mv(commands::admin::MvArgs),
}
