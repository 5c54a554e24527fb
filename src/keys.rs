//! Key extraction and approximate matching strategies.
//!
//! Every set operation (sort, overlap, search) compares rearrangements by a
//! configurable key: the raw nucleotide sequence, the translated amino-acid
//! sequence, or the CDR3 substring. Extraction is a pure function of the
//! record; matching slides the search string over the key under a bounded
//! mismatch budget.

use crate::model::Rearrangement;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    Rearrangement,
    AminoAcid,
    Cdr3,
}

impl KeyType {
    pub fn extract<'a>(&self, r: &'a Rearrangement) -> &'a str {
        match self {
            KeyType::Rearrangement => &r.rearrangement,
            KeyType::AminoAcid => &r.amino_acid,
            KeyType::Cdr3 => &r.cdr3,
        }
    }

    /// Stable identity used in secondary-cache keys; must survive process
    /// restarts, so never derive it from anything runtime-dependent.
    pub fn cache_id(&self) -> &'static str {
        match self {
            KeyType::Rearrangement => "rearrangement",
            KeyType::AminoAcid => "aminoacid",
            KeyType::Cdr3 => "cdr3",
        }
    }
}

/// Ungapped sliding-window matcher with a fixed mismatch budget.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    pub allowed_mismatches: usize,
    pub full_length: bool,
    /// Treat 'N' as a wildcard. Disabled everywhere for now: real files
    /// carry long N runs at the edges that over-match wildly.
    pub n_is_wild: bool,
}

impl Matcher {
    pub fn new(allowed_mismatches: usize, full_length: bool) -> Self {
        Matcher {
            allowed_mismatches,
            full_length,
            n_is_wild: false,
        }
    }

    /// True when `search` matches any window of `key` with at most the
    /// allowed number of mismatches. Comparison is case-sensitive.
    pub fn matches(&self, search: &str, key: &str) -> bool {
        if search.is_empty() || key.is_empty() {
            return false;
        }

        let search = search.as_bytes();
        let key = key.as_bytes();

        if self.full_length && search.len() != key.len() {
            return false;
        }

        if search.len() > key.len() {
            return false;
        }

        let window_count = key.len() - search.len() + 1;

        for start in 0..window_count {
            let mut remaining = self.allowed_mismatches;
            let mut j = 0;

            while j < search.len() {
                let ck = key[start + j];
                let cs = search[j];

                if ck != cs && (!self.n_is_wild || (ck != b'N' && cs != b'N')) {
                    if remaining == 0 {
                        break;
                    }
                    remaining -= 1;
                }

                j += 1;
            }

            if j == search.len() {
                return true;
            }
        }

        false
    }
}
