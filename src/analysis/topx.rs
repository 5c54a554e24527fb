//! Bounded best-N ranking of rearrangements per repertoire.

use crate::analysis::RepertoireResult;
use crate::exec::WorkerPool;
use crate::model::{Rearrangement, Repertoire};
use crate::store::ContextStore;
use crate::tsv;
use crate::{ClonescanError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

fn default_max_count() -> usize {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopXConfig {
    /// Ceiling on a caller's requested N.
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

impl Default for TopXConfig {
    fn default() -> Self {
        TopXConfig {
            max_count: default_max_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TopXSort {
    #[default]
    Count,
    FractionOfCells,
    FractionOfLocus,
    FractionOfCount,
    /// Diagnostic-flagged clones first, then fraction of locus.
    DxPotential,
}

impl TopXSort {
    pub fn compare(&self, a: &Rearrangement, b: &Rearrangement, rep: &Repertoire) -> Ordering {
        match self {
            TopXSort::Count => a.count.cmp(&b.count),
            TopXSort::FractionOfCells => total_cmp(a.fraction_of_cells(rep), b.fraction_of_cells(rep)),
            TopXSort::FractionOfLocus => total_cmp(a.fraction_of_locus(rep), b.fraction_of_locus(rep)),
            TopXSort::FractionOfCount => total_cmp(a.fraction_of_count(rep), b.fraction_of_count(rep)),
            TopXSort::DxPotential => a
                .dx
                .cmp(&b.dx)
                .then_with(|| total_cmp(a.fraction_of_locus(rep), b.fraction_of_locus(rep))),
        }
    }
}

fn total_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[derive(Debug, Clone)]
pub struct TopXParams {
    pub sort: TopXSort,
    pub count: usize,
}

/// Best-N rearrangements per repertoire, processed in parallel, returned
/// in request order.
pub fn top_rearrangements(
    config: &TopXConfig,
    pool: &WorkerPool,
    ctx: &ContextStore,
    names: &[String],
    params: &TopXParams,
) -> Result<Vec<RepertoireResult>> {
    if params.count > config.max_count {
        return Err(ClonescanError::Capacity(format!(
            "top {} requested, max is {}",
            params.count, config.max_count
        )));
    }

    let tasks: Vec<_> = names
        .iter()
        .map(|name| move || top_one(ctx, name, params))
        .collect();

    pool.run_all(tasks)
}

fn top_one(ctx: &ContextStore, name: &str, params: &TopXParams) -> Result<RepertoireResult> {
    let rep = ctx.find_repertoire(name)?;

    let input = ctx.open_repertoire(name)?;
    let mut reader = tsv::Reader::new(input, 0);

    let mut best: Vec<Rearrangement> = Vec::with_capacity(params.count);
    while let Some(r) = reader.read_next()? {
        insert_ranked(&mut best, r, params.sort, &rep, params.count);
    }

    Ok(RepertoireResult {
        repertoire: rep,
        rearrangements: best,
        truncated: None,
        selection_indices: None,
    })
}

/// Reverse linear-scan insert into a descending ranked list. Walking from
/// the worst entry backwards exits immediately for the common candidate
/// that does not qualify.
fn insert_ranked(
    list: &mut Vec<Rearrangement>,
    r: Rearrangement,
    sort: TopXSort,
    rep: &Repertoire,
    max_size: usize,
) {
    if max_size == 0 {
        return;
    }

    let mut i = list.len();
    while i > 0 && sort.compare(&r, &list[i - 1], rep) == Ordering::Greater {
        i -= 1;
    }

    if list.len() < max_size {
        list.insert(i, r);
    } else if i < list.len() {
        list.insert(i, r);
        list.truncate(max_size);
    }
}
