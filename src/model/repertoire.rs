use crate::model::locus::{Locus, LocusGroup};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Summary statistics for one sample. Mutated only by `accumulate` during
/// ingestion; immutable thereafter. The sum of `locus_counts` always equals
/// `total_count`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repertoire {
    pub name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub total_cells: u64,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub total_uniques: u64,
    #[serde(default)]
    pub total_milliliters: f64,
    #[serde(default)]
    pub locus_counts: BTreeMap<LocusGroup, u64>,
}

impl Repertoire {
    pub fn new(name: &str) -> Self {
        Repertoire {
            name: name.to_string(),
            ..Repertoire::default()
        }
    }

    /// Cell-free assays report a sample volume instead of a cell count.
    pub fn is_cellfree(&self) -> bool {
        self.total_milliliters > 0.0
    }

    pub fn accumulate(&mut self, locus: Locus, count: u64) {
        self.total_count += count;
        self.total_uniques += 1;
        *self.locus_counts.entry(locus.group()).or_insert(0) += count;
    }

    pub fn fraction_of_locus(&self, count: u64, locus: Locus) -> f64 {
        match self.locus_counts.get(&locus.group()) {
            Some(&total) if total > 0 => count as f64 / total as f64,
            _ => 0.0,
        }
    }

    pub fn fraction_of_count(&self, count: u64) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        count as f64 / self.total_count as f64
    }

    pub fn fraction_of_cells(&self, count: u64) -> f64 {
        if self.total_cells == 0 {
            return 0.0;
        }
        count as f64 / self.total_cells as f64
    }

    pub fn count_per_milliliter(&self, count: u64) -> f64 {
        if self.total_milliliters == 0.0 {
            return 0.0;
        }
        count as f64 / self.total_milliliters
    }

    pub fn find<'a>(reps: &'a [Repertoire], name: &str) -> Option<&'a Repertoire> {
        reps.iter().find(|r| r.name == name)
    }

    /// Chronological order for longitudinal views: dated samples first by
    /// date, undated samples last, name as the tiebreak.
    pub fn compare_by_date(a: &Repertoire, b: &Repertoire) -> Ordering {
        match (a.date, b.date) {
            (Some(da), Some(db)) => da.cmp(&db).then_with(|| a.name.cmp(&b.name)),
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => a.name.cmp(&b.name),
        }
    }
}
