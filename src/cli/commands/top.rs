use crate::analysis::{top_rearrangements, TopXParams, TopXSort};
use crate::cli::commands::{open_store, print_json, ScopeArgs};
use crate::config::Config;
use crate::exec::WorkerPool;
use crate::store::ContextStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct TopArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Repertoires to rank
    #[arg(short, long, num_args = 1.., required = true)]
    pub reps: Vec<String>,

    /// Ranking comparator
    #[arg(short, long, value_enum, default_value_t = TopXSort::Count)]
    pub sort: TopXSort,

    /// How many clones to keep per repertoire
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,
}

pub fn run(args: TopArgs, config: &Config, pool: &WorkerPool) -> anyhow::Result<()> {
    let store = open_store(&args.scope.store, config)?;
    let ctx = ContextStore::new(&store, &args.scope.user, &args.scope.context);

    let params = TopXParams {
        sort: args.sort,
        count: args.count,
    };

    let results = top_rearrangements(&config.topx, pool, &ctx, &args.reps, &params)?;
    print_json(&results)
}
