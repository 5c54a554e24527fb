use clap::Parser;
use clonescan::cli::{commands, Cli, Commands};
use clonescan::config::{load_config, Config};
use clonescan::exec::WorkerPool;
use clonescan::ClonescanError;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let log_level = std::env::var("CLONESCAN_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<ClonescanError>() {
            Some(ClonescanError::Config(_)) => 2,
            Some(ClonescanError::Io(_)) => 3,
            Some(ClonescanError::Parse(_)) => 4,
            Some(ClonescanError::NotFound(_)) => 5,
            Some(ClonescanError::Capacity(_)) => 6,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let pool = WorkerPool::new(cli.threads)?;

    match cli.command {
        Commands::Ingest(args) => commands::ingest::run(args, &config),
        Commands::List(args) => commands::list::run(args, &config),
        Commands::Search(args) => commands::search::run(args, &config, &pool),
        Commands::Overlap(args) => commands::overlap::run(args, &config, &pool),
        Commands::Top(args) => commands::top::run(args, &config, &pool),
        Commands::Genes(args) => commands::genes::run(args, &config),
        Commands::Track(args) => commands::track::run(args, &config, &pool),
        Commands::Rm(args) => commands::rm::run(args, &config),
        Commands::Cp(args) => commands::admin::run_cp(args, &config),
        Commands::Mv(args) => commands::admin::run_mv(args, &config),
    }
}
