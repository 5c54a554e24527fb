//! Longitudinal MRD tracking: follow explicit target clones across a
//! patient's repertoires over time.

use crate::analysis::mrd::{MrdConfig, MrdMatcher};
use crate::analysis::topx::{top_rearrangements, TopXConfig, TopXParams, TopXSort};
use crate::analysis::RepertoireResult;
use crate::exec::WorkerPool;
use crate::model::{Rearrangement, Repertoire};
use crate::store::ContextStore;
use crate::tsv;
use crate::{ClonescanError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_max_targets() -> usize {
    50
}

fn default_dx_options_count() -> usize {
    20
}

fn default_dx_options_min_fraction_of_locus() -> f64 {
    0.05
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,
    /// Candidates pulled per repertoire during option discovery.
    #[serde(default = "default_dx_options_count")]
    pub dx_options_count: usize,
    /// Discovery keeps unflagged candidates only at or above this share of
    /// their locus group.
    #[serde(default = "default_dx_options_min_fraction_of_locus")]
    pub dx_options_min_fraction_of_locus: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            max_targets: default_max_targets(),
            dx_options_count: default_dx_options_count(),
            dx_options_min_fraction_of_locus: default_dx_options_min_fraction_of_locus(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TargetValues {
    pub target: Rearrangement,
    /// Normalized abundance per repertoire, in result repertoire order:
    /// count per milliliter for cell-free samples, fraction of input cells
    /// otherwise.
    pub values: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct TrackingResult {
    /// Chronological: dated first, undated last, names break ties.
    pub repertoires: Vec<Repertoire>,
    /// One row per requested target, in request order.
    pub target_values: Vec<TargetValues>,
}

pub struct Tracking<'a> {
    config: TrackingConfig,
    topx_config: TopXConfig,
    matcher: MrdMatcher,
    pool: &'a WorkerPool,
}

impl<'a> Tracking<'a> {
    pub fn new(
        config: TrackingConfig,
        mrd_config: &MrdConfig,
        topx_config: TopXConfig,
        pool: &'a WorkerPool,
    ) -> Self {
        Tracking {
            config,
            topx_config,
            matcher: MrdMatcher::new(mrd_config),
            pool,
        }
    }

    pub fn track(
        &self,
        ctx: &ContextStore,
        names: &[String],
        targets: &[Rearrangement],
    ) -> Result<TrackingResult> {
        if targets.len() > self.config.max_targets {
            return Err(ClonescanError::Capacity(format!(
                "{} tracking targets requested, max is {}",
                targets.len(),
                self.config.max_targets
            )));
        }

        let mut repertoires = Vec::with_capacity(names.len());
        for name in names {
            repertoires.push(ctx.find_repertoire(name)?);
        }
        repertoires.sort_by(Repertoire::compare_by_date);

        debug!(
            repertoires = repertoires.len(),
            targets = targets.len(),
            "tracking targets"
        );

        let tasks: Vec<_> = repertoires
            .iter()
            .map(|rep| {
                let matcher = self.matcher;
                move || -> Result<Vec<u64>> { match_targets(ctx, rep, targets, &matcher) }
            })
            .collect();
        let per_rep_counts = self.pool.run_all(tasks)?;

        let mut target_values: Vec<TargetValues> = targets
            .iter()
            .map(|t| TargetValues {
                target: t.clone(),
                values: vec![0.0; repertoires.len()],
            })
            .collect();

        for (irep, (rep, counts)) in repertoires.iter().zip(&per_rep_counts).enumerate() {
            for (itarget, &count) in counts.iter().enumerate() {
                target_values[itarget].values[irep] = normalize(rep, count);
            }
        }

        Ok(TrackingResult {
            repertoires,
            target_values,
        })
    }

    /// Candidate clones worth tracking: per-repertoire diagnostic-potential
    /// leaders that are flagged or abundant enough, with flagged clones
    /// pre-selected once each across assays via MRD identity.
    pub fn dx_options(&self, ctx: &ContextStore, names: &[String]) -> Result<Vec<RepertoireResult>> {
        let params = TopXParams {
            sort: TopXSort::DxPotential,
            count: self.config.dx_options_count,
        };
        let mut potentials = top_rearrangements(&self.topx_config, self.pool, ctx, names, &params)?;
        potentials.sort_by(|a, b| Repertoire::compare_by_date(&a.repertoire, &b.repertoire));

        let mut results = Vec::new();
        let mut seen: Vec<Rearrangement> = Vec::new();

        for potential in potentials {
            if potential.rearrangements.is_empty() {
                continue;
            }

            let mut kept = Vec::new();
            let mut selection_indices = Vec::new();

            for r in potential.rearrangements {
                let fraction = r.fraction_of_locus(&potential.repertoire);
                let qualifies =
                    r.dx || fraction >= self.config.dx_options_min_fraction_of_locus;
                if qualifies {
                    kept.push(r.clone());
                }

                if r.dx && !seen.iter().any(|s| self.matcher.match_records(&r, s)) {
                    selection_indices.push(kept.len() - 1);
                    seen.push(r);
                }
            }

            if !kept.is_empty() {
                results.push(RepertoireResult {
                    repertoire: potential.repertoire,
                    rearrangements: kept,
                    truncated: None,
                    selection_indices: Some(selection_indices),
                });
            }
        }

        Ok(results)
    }
}

/// Sum of matched template counts per target within one repertoire,
/// returned in target order.
fn match_targets(
    ctx: &ContextStore,
    rep: &Repertoire,
    targets: &[Rearrangement],
    matcher: &MrdMatcher,
) -> Result<Vec<u64>> {
    let input = ctx.open_repertoire(&rep.name)?;
    let mut reader = tsv::Reader::new(input, 0);

    let mut counts = vec![0u64; targets.len()];
    while let Some(r) = reader.read_next()? {
        for (i, target) in targets.iter().enumerate() {
            if matcher.match_records(target, &r) {
                counts[i] += r.count;
            }
        }
    }

    Ok(counts)
}

fn normalize(rep: &Repertoire, count: u64) -> f64 {
    if rep.is_cellfree() {
        rep.count_per_milliliter(count)
    } else {
        rep.fraction_of_cells(count)
    }
}
