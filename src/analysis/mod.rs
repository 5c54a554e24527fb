//! Analytical operations over stored repertoires: overlap, fuzzy search,
//! top-K ranking, gene usage, and longitudinal MRD tracking.

pub mod gene_use;
pub mod mrd;
pub mod overlap;
pub mod search;
pub mod topx;
pub mod tracking;

pub use gene_use::{gene_use, GeneUseParams, GeneUseResult};
pub use mrd::{MrdConfig, MrdMatcher};
pub use overlap::{Overlap, OverlapConfig, OverlapMode, OverlapResult, OverlapResultItem};
pub use search::{search, SearchConfig, SearchParams};
pub use topx::{top_rearrangements, TopXConfig, TopXParams, TopXSort};
pub use tracking::{Tracking, TrackingConfig, TrackingResult, TargetValues};

use crate::model::{Rearrangement, Repertoire};
use serde::Serialize;

/// One repertoire's slice of a multi-repertoire result.
#[derive(Debug, Clone, Serialize)]
pub struct RepertoireResult {
    pub repertoire: Repertoire,
    pub rearrangements: Vec<Rearrangement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_indices: Option<Vec<usize>>,
}

impl RepertoireResult {
    pub fn new(repertoire: Repertoire) -> Self {
        RepertoireResult {
            repertoire,
            rearrangements: Vec::new(),
            truncated: None,
            selection_indices: None,
        }
    }
}
