use crate::analysis::Tracking;
use crate::cli::commands::{open_store, print_json, ScopeArgs};
use crate::config::Config;
use crate::exec::WorkerPool;
use crate::model::Rearrangement;
use crate::store::ContextStore;
use crate::tsv;
use clap::Args;
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TrackArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Repertoires to track across
    #[arg(short, long, num_args = 1.., required = true)]
    pub reps: Vec<String>,

    /// TSV file of target rearrangements (required unless --discover)
    #[arg(short, long, value_name = "FILE", required_unless_present = "discover")]
    pub targets: Option<PathBuf>,

    /// Discover tracking candidates instead of tracking explicit targets
    #[arg(long)]
    pub discover: bool,
}

pub fn run(args: TrackArgs, config: &Config, pool: &WorkerPool) -> anyhow::Result<()> {
    let store = open_store(&args.scope.store, config)?;
    let ctx = ContextStore::new(&store, &args.scope.user, &args.scope.context);

    let tracking = Tracking::new(
        config.tracking.clone(),
        &config.mrd,
        config.topx.clone(),
        pool,
    );

    if args.discover {
        let options = tracking.dx_options(&ctx, &args.reps)?;
        return print_json(&options);
    }

    let targets = match &args.targets {
        Some(path) => read_targets(path)?,
        None => Vec::new(),
    };

    let result = tracking.track(&ctx, &args.reps, &targets)?;
    print_json(&result)
}

fn read_targets(path: &PathBuf) -> crate::Result<Vec<Rearrangement>> {
    let file = File::open(path)?;
    let mut reader = tsv::Reader::new(file, 0);

    let mut targets = Vec::new();
    while let Some(r) = reader.read_next()? {
        targets.push(r);
    }
    Ok(targets)
}
