//! Cross-assay sequence identity for MRD tracking.
//!
//! Different assay versions report the same clone with different read
//! windows, so equality on the raw sequence is too strict. Matching aligns
//! both sequences at their J index (or the right edge when either index is
//! unresolved), scans right then left failing fast on any mismatch, and
//! requires a minimum mismatch-free overlap so short fragments cannot
//! over-match. The relation is symmetric by construction.

use crate::model::Rearrangement;
use serde::{Deserialize, Serialize};

fn default_min_match_length() -> usize {
    25
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrdConfig {
    #[serde(default = "default_min_match_length")]
    pub min_match_length: usize,
}

impl Default for MrdConfig {
    fn default() -> Self {
        MrdConfig {
            min_match_length: default_min_match_length(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MrdMatcher {
    min_match_length: usize,
}

impl MrdMatcher {
    pub fn new(cfg: &MrdConfig) -> Self {
        MrdMatcher {
            min_match_length: cfg.min_match_length,
        }
    }

    pub fn match_records(&self, a: &Rearrangement, b: &Rearrangement) -> bool {
        self.match_anchored(
            &a.rearrangement,
            anchor(a),
            &b.rearrangement,
            anchor(b),
        )
    }

    /// Match two sequences aligned at their anchor positions. Caseless.
    pub fn match_anchored(&self, s1: &str, j1: usize, s2: &str, j2: usize) -> bool {
        let b1 = s1.as_bytes();
        let b2 = s2.as_bytes();

        // an anchor past either end means neither is usable
        let (j1, j2) = if j1 >= b1.len() || j2 >= b2.len() {
            (b1.len(), b2.len())
        } else {
            (j1, j2)
        };

        let mut matched = 0usize;

        // right of the anchor
        let mut i1 = j1;
        let mut i2 = j2;
        while i1 < b1.len() && i2 < b2.len() {
            if !eq_caseless(b1[i1], b2[i2]) {
                return false;
            }
            i1 += 1;
            i2 += 1;
            matched += 1;
        }

        // left of the anchor
        let mut i1 = j1;
        let mut i2 = j2;
        while i1 > 0 && i2 > 0 {
            i1 -= 1;
            i2 -= 1;
            if !eq_caseless(b1[i1], b2[i2]) {
                return false;
            }
            matched += 1;
        }

        matched >= self.min_match_length
    }
}

/// Anchor position for a record: its J index when resolved and in range,
/// the sequence end otherwise.
fn anchor(r: &Rearrangement) -> usize {
    let len = r.rearrangement.len();
    if r.j_index < 0 || r.j_index as usize > len {
        len
    } else {
        r.j_index as usize
    }
}

fn eq_caseless(a: u8, b: u8) -> bool {
    a.eq_ignore_ascii_case(&b)
}
