//! V/J gene-usage aggregation for one repertoire.

use crate::store::ContextStore;
use crate::tsv;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct GeneUseParams {
    /// Count records with no gene call under the pseudo-gene `X`.
    pub include_unknown: bool,
    /// Count family-only calls under `<family>-X`.
    pub include_family_only: bool,
}

/// Parallel arrays, one (V, J, count) point per index, sorted by gene pair.
/// This is the shape charting front ends consume directly.
#[derive(Debug, Serialize)]
pub struct GeneUseResult {
    pub v_genes: Vec<String>,
    pub j_genes: Vec<String>,
    pub counts: Vec<u64>,
}

pub fn gene_use(ctx: &ContextStore, name: &str, params: &GeneUseParams) -> Result<GeneUseResult> {
    ctx.find_repertoire(name)?;

    let input = ctx.open_repertoire(name)?;
    let mut reader = tsv::Reader::new(input, 0);

    let mut pairs: BTreeMap<(String, String), u64> = BTreeMap::new();

    while let Some(r) = reader.read_next()? {
        let Some(v) = normalize_gene(&r.v_resolved, params) else {
            continue;
        };
        let Some(j) = normalize_gene(&r.j_resolved, params) else {
            continue;
        };

        *pairs.entry((v, j)).or_insert(0) += r.count;
    }

    debug!(repertoire = name, pairs = pairs.len(), "gene usage aggregated");

    let mut result = GeneUseResult {
        v_genes: Vec::with_capacity(pairs.len()),
        j_genes: Vec::with_capacity(pairs.len()),
        counts: Vec::with_capacity(pairs.len()),
    };

    for ((v, j), count) in pairs {
        result.v_genes.push(v);
        result.j_genes.push(j);
        result.counts.push(count);
    }

    Ok(result)
}

/// Canonical gene name: allele suffix stripped, unknowns and family-only
/// calls mapped to pseudo-genes or skipped per the params.
fn normalize_gene(resolved: &str, params: &GeneUseParams) -> Option<String> {
    let trimmed = resolved.trim();
    if trimmed.is_empty() {
        return params.include_unknown.then(|| "X".to_string());
    }

    let no_allele = match trimmed.rfind('*') {
        Some(i) => &trimmed[..i],
        None => trimmed,
    };

    if !no_allele.contains('-') {
        return params
            .include_family_only
            .then(|| format!("{}-X", no_allele));
    }

    Some(no_allele.to_string())
}
