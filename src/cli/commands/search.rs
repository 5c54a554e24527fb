use crate::analysis::{search, SearchParams};
use crate::cli::commands::{open_store, print_json, ScopeArgs};
use crate::config::Config;
use crate::exec::WorkerPool;
use crate::keys::KeyType;
use crate::store::ContextStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Repertoires to search
    #[arg(short, long, num_args = 1.., required = true)]
    pub reps: Vec<String>,

    /// Motif to search for
    #[arg(short, long)]
    pub motif: String,

    /// Key to match the motif against
    #[arg(short, long, value_enum, default_value_t = KeyType::Rearrangement)]
    pub key: KeyType,

    /// Allowed mismatches per window
    #[arg(long, default_value = "0")]
    pub mismatches: usize,
}

pub fn run(args: SearchArgs, config: &Config, pool: &WorkerPool) -> anyhow::Result<()> {
    let store = open_store(&args.scope.store, config)?;
    let ctx = ContextStore::new(&store, &args.scope.user, &args.scope.context);

    let params = SearchParams {
        motif: args.motif.clone(),
        key_type: args.key,
        allowed_mismatches: args.mismatches,
    };

    let results = search(&config.search, pool, &ctx, &args.reps, &params)?;
    print_json(&results)
}
