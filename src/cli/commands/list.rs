use crate::cli::commands::{open_store, print_json};
use crate::config::Config;
use crate::store::RepertoireStore;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Store base directory (overrides the config file)
    #[arg(long, env = "CLONESCAN_STORE")]
    pub store: Option<PathBuf>,

    /// Owning user id
    #[arg(short, long, env = "CLONESCAN_USER")]
    pub user: String,

    /// Context to list repertoires from; omit to list the user's contexts
    #[arg(short = 'x', long, env = "CLONESCAN_CONTEXT")]
    pub context: Option<String>,
}

pub fn run(args: ListArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(&args.store, config)?;

    match &args.context {
        Some(context) => {
            let reps = store.context_repertoires(&args.user, context)?;
            print_json(&reps)
        }
        None => {
            let contexts = store.user_contexts(&args.user)?;
            print_json(&contexts)
        }
    }
}
