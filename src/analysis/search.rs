//! Fuzzy motif search across repertoires.

use crate::analysis::RepertoireResult;
use crate::exec::WorkerPool;
use crate::keys::{KeyType, Matcher};
use crate::store::ContextStore;
use crate::tsv;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_max_results() -> usize {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Matches kept per repertoire before the truncation flag is set.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub motif: String,
    pub key_type: KeyType,
    pub allowed_mismatches: usize,
}

/// Stream each requested repertoire once, collecting records whose key
/// matches the motif. Repertoires run in parallel; results come back in
/// request order. Any unknown name fails the whole request before work
/// starts.
pub fn search(
    config: &SearchConfig,
    pool: &WorkerPool,
    ctx: &ContextStore,
    names: &[String],
    params: &SearchParams,
) -> Result<Vec<RepertoireResult>> {
    let mut repertoires = Vec::with_capacity(names.len());
    for name in names {
        repertoires.push(ctx.find_repertoire(name)?);
    }

    debug!(motif = %params.motif, repertoires = names.len(), "searching");

    let matcher = Matcher::new(params.allowed_mismatches, false);
    let tasks: Vec<_> = names
        .iter()
        .map(|name| {
            move || -> Result<(Vec<crate::model::Rearrangement>, bool)> {
                search_one(config, ctx, name, params, &matcher)
            }
        })
        .collect();

    let found = pool.run_all(tasks)?;

    Ok(repertoires
        .into_iter()
        .zip(found)
        .map(|(rep, (rearrangements, truncated))| RepertoireResult {
            repertoire: rep,
            rearrangements,
            truncated: Some(truncated),
            selection_indices: None,
        })
        .collect())
}

fn search_one(
    config: &SearchConfig,
    ctx: &ContextStore,
    name: &str,
    params: &SearchParams,
    matcher: &Matcher,
) -> Result<(Vec<crate::model::Rearrangement>, bool)> {
    let input = ctx.open_repertoire(name)?;
    let mut reader = tsv::Reader::new(input, 0);

    let mut matches = Vec::new();
    let mut truncated = false;

    while let Some(r) = reader.read_next()? {
        if !matcher.matches(&params.motif, params.key_type.extract(&r)) {
            continue;
        }

        if matches.len() >= config.max_results {
            truncated = true;
            break;
        }
        matches.push(r);
    }

    Ok((matches, truncated))
}
