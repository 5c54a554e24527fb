use crate::model::locus::{FrameType, Locus};
use crate::model::repertoire::Repertoire;
use serde::{Deserialize, Serialize};

/// One parsed receptor sequence row: gene calls, counts, and derived
/// positions. Index fields are -1 when the pipeline could not resolve the
/// segment; they are never used as a slice bound without a guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rearrangement {
    pub rearrangement: String,
    pub amino_acid: String,
    pub frame_type: FrameType,
    pub locus: Locus,
    pub count: u64,

    pub v_resolved: String,
    pub d_resolved: String,
    pub j_resolved: String,
    pub v_ties: String,
    pub d_ties: String,
    pub j_ties: String,

    pub cdr3_length: i32,
    pub v_index: i32,
    pub d_index: i32,
    pub j_index: i32,
    pub n1_index: i32,
    pub n2_index: i32,

    pub v_shm_indices: Option<Vec<i32>>,

    /// log10 clone generation probability, 0.0 when the file carries none.
    pub probability: f64,
    /// Diagnostic clone flagged by the pipeline in its sequence tags.
    pub dx: bool,

    /// CDR3 substring of `rearrangement`, computed once after parsing;
    /// empty when indices are unresolved or out of range.
    pub cdr3: String,
}

impl Rearrangement {
    /// Derive and store the CDR3 substring. The region starts at the V
    /// index (falling back to the D index) and runs for `cdr3_length`
    /// bytes; anything unresolved or out of range yields empty.
    pub fn compute_cdr3(&mut self) {
        let start = if self.v_index >= 0 {
            self.v_index
        } else {
            self.d_index
        };

        self.cdr3.clear();

        if start < 0 || self.cdr3_length <= 0 {
            return;
        }

        let start = start as usize;
        let end = start + self.cdr3_length as usize;

        if end <= self.rearrangement.len() {
            self.cdr3.push_str(&self.rearrangement[start..end]);
        }
    }

    pub fn fraction_of_locus(&self, rep: &Repertoire) -> f64 {
        rep.fraction_of_locus(self.count, self.locus)
    }

    pub fn fraction_of_count(&self, rep: &Repertoire) -> f64 {
        rep.fraction_of_count(self.count)
    }

    pub fn fraction_of_cells(&self, rep: &Repertoire) -> f64 {
        rep.fraction_of_cells(self.count)
    }
}

impl Default for Rearrangement {
    fn default() -> Self {
        Rearrangement {
            rearrangement: String::new(),
            amino_acid: String::new(),
            frame_type: FrameType::Out,
            locus: Locus::Tcrb,
            count: 0,
            v_resolved: String::new(),
            d_resolved: String::new(),
            j_resolved: String::new(),
            v_ties: String::new(),
            d_ties: String::new(),
            j_ties: String::new(),
            cdr3_length: -1,
            v_index: -1,
            d_index: -1,
            j_index: -1,
            n1_index: -1,
            n2_index: -1,
            v_shm_indices: None,
            probability: 0.0,
            dx: false,
            cdr3: String::new(),
        }
    }
}
