use crate::cli::commands::{open_store, ScopeArgs};
use crate::config::Config;
use crate::store::{RepertoireSpec, RepertoireStore};
use clap::Args;
use colored::*;

#[derive(Args, Debug)]
pub struct RmArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Repertoire to delete
    #[arg(short, long)]
    pub name: String,
}

pub fn run(args: RmArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(&args.scope.store, config)?;
    let spec = RepertoireSpec::new(&args.scope.user, &args.scope.context, &args.name);

    store.delete_repertoire(&spec)?;
    eprintln!("{} {}", "Deleted:".green().bold(), spec);
    Ok(())
}
