use crate::analysis::{gene_use, GeneUseParams};
use crate::cli::commands::{open_store, print_json, ScopeArgs};
use crate::config::Config;
use crate::store::ContextStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct GenesArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Repertoire to aggregate
    #[arg(short, long)]
    pub name: String,

    /// Count records with no gene call under the pseudo-gene X
    #[arg(long)]
    pub include_unknown: bool,

    /// Count family-only calls under <family>-X
    #[arg(long)]
    pub include_family_only: bool,
}

pub fn run(args: GenesArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(&args.scope.store, config)?;
    let ctx = ContextStore::new(&store, &args.scope.user, &args.scope.context);

    let params = GeneUseParams {
        include_unknown: args.include_unknown,
        include_family_only: args.include_family_only,
    };

    let result = gene_use(&ctx, &args.name, &params)?;
    print_json(&result)
}
