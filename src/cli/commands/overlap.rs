use crate::analysis::{Overlap, OverlapMode};
use crate::cli::commands::{open_store, print_json, ScopeArgs};
use crate::config::Config;
use crate::exec::WorkerPool;
use crate::keys::KeyType;
use crate::store::ContextStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct OverlapArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Repertoires to overlap
    #[arg(short, long, num_args = 2.., required = true)]
    pub reps: Vec<String>,

    /// Key to compare repertoires by
    #[arg(short, long, value_enum, default_value_t = KeyType::Rearrangement)]
    pub key: KeyType,

    /// Overlap mode
    #[arg(short, long, value_enum, default_value_t = OverlapMode::Standard)]
    pub mode: OverlapMode,
}

pub fn run(args: OverlapArgs, config: &Config, pool: &WorkerPool) -> anyhow::Result<()> {
    let store = open_store(&args.scope.store, config)?;
    let ctx = ContextStore::new(&store, &args.scope.user, &args.scope.context);

    let overlap = Overlap::new(config.overlap.clone(), config.sorter.clone(), pool);
    let result = overlap.run(&ctx, &args.reps, args.key, args.mode)?;
    print_json(&result)
}
