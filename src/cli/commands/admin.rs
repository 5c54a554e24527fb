use crate::cli::commands::{open_store, ScopeArgs};
use crate::config::Config;
use crate::store::admin::{copy_repertoire, move_repertoire};
use crate::store::RepertoireSpec;
use crate::tsv::Ingest;
use clap::Args;
use colored::*;

#[derive(Args, Debug)]
pub struct CpArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Source repertoire
    #[arg(short, long)]
    pub name: String,

    /// Destination user (defaults to the source user)
    #[arg(long)]
    pub to_user: Option<String>,

    /// Destination context (defaults to the source context)
    #[arg(long)]
    pub to_context: Option<String>,

    /// Destination name (defaults to the source name)
    #[arg(long)]
    pub to_name: Option<String>,
}

#[derive(Args, Debug)]
pub struct MvArgs {
    #[command(flatten)]
    pub args: CpArgs,
}

pub fn run_cp(args: CpArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(&args.scope.store, config)?;
    let (from, to) = resolve_specs(&args);

    match copy_repertoire(&store, &from, &to)? {
        Ingest::Ok(_) => eprintln!("{} {} -> {}", "Copied:".green().bold(), from, to),
        Ingest::Exists => eprintln!(
            "{} destination {} already exists",
            "Skipped:".yellow().bold(),
            to
        ),
    }
    Ok(())
}

pub fn run_mv(args: MvArgs, config: &Config) -> anyhow::Result<()> {
    let args = args.args;
    let store = open_store(&args.scope.store, config)?;
    let (from, to) = resolve_specs(&args);

    match move_repertoire(&store, &from, &to)? {
        Ingest::Ok(_) => eprintln!("{} {} -> {}", "Moved:".green().bold(), from, to),
        Ingest::Exists => eprintln!(
            "{} destination {} already exists, source kept",
            "Skipped:".yellow().bold(),
            to
        ),
    }
    Ok(())
}

fn resolve_specs(args: &CpArgs) -> (RepertoireSpec, RepertoireSpec) {
    let from = RepertoireSpec::new(&args.scope.user, &args.scope.context, &args.name);

    let partial = RepertoireSpec {
        user_id: args.to_user.clone().unwrap_or_default(),
        context: args.to_context.clone().unwrap_or_default(),
        name: args.to_name.clone().unwrap_or_default(),
    };

    let to = partial.with_fallback(&from);
    (from, to)
}
