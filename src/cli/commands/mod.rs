pub mod admin;
pub mod genes;
pub mod ingest;
pub mod list;
pub mod overlap;
pub mod rm;
pub mod search;
pub mod top;
pub mod track;

use crate::config::Config;
use crate::store::FsStore;
use clap::Args;
use std::path::PathBuf;

/// Store and ownership scoping shared by every subcommand.
#[derive(Args, Debug)]
pub struct ScopeArgs {
    /// Store base directory (overrides the config file)
    #[arg(long, env = "CLONESCAN_STORE")]
    pub store: Option<PathBuf>,

    /// Owning user id
    #[arg(short, long, env = "CLONESCAN_USER")]
    pub user: String,

    /// Context (collection) name
    #[arg(short = 'x', long, env = "CLONESCAN_CONTEXT")]
    pub context: String,
}

pub(crate) fn open_store(store_override: &Option<PathBuf>, config: &Config) -> crate::Result<FsStore> {
    let mut cfg = config.store.clone();
    if let Some(path) = store_override {
        cfg.base_path = path.clone();
    }
    FsStore::new(cfg)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
