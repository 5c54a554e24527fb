//! Clone overlap between repertoires.
//!
//! Each repertoire is reduced to its sorted unique keys, then the streams
//! are merged N ways: every step takes the globally smallest current key,
//! gathers the streams positioned at it, and advances them together. The
//! whole computation must finish before truncation because ranking needs
//! the true global order.

use crate::exec::WorkerPool;
use crate::keys::KeyType;
use crate::model::Repertoire;
use crate::sort::{KeySorter, KeyStream, SorterConfig};
use crate::store::ContextStore;
use crate::{ClonescanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

fn default_max_repertoires() -> usize {
    6
}

fn default_max_standard_overlaps() -> usize {
    1000
}

fn default_max_combined_key_length() -> usize {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapConfig {
    #[serde(default = "default_max_repertoires")]
    pub max_repertoires: usize,
    #[serde(default = "default_max_standard_overlaps")]
    pub max_standard_overlaps: usize,
    /// Bound on a combined item's concatenated key text.
    #[serde(default = "default_max_combined_key_length")]
    pub max_combined_key_length: usize,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        OverlapConfig {
            max_repertoires: default_max_repertoires(),
            max_standard_overlaps: default_max_standard_overlaps(),
            max_combined_key_length: default_max_combined_key_length(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverlapMode {
    /// Keys present in more than one repertoire, ranked by overlappiness.
    #[default]
    Standard,
    /// Every key, one item per distinct per-repertoire count profile, keys
    /// concatenated. No ranking.
    Combined,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverlapResultItem {
    pub key: String,
    /// Number of keys folded into this item (> 1 only in combined mode).
    pub key_count: usize,
    pub present_in: usize,
    /// Per-repertoire counts, in result repertoire order.
    pub counts: Vec<u64>,
    pub max_count: u64,
}

impl OverlapResultItem {
    fn append_key(&mut self, new_key: &str, max_len: usize) {
        self.key_count += 1;

        if self.key.ends_with("...") {
            return;
        }

        if self.key.len() + new_key.len() + 2 > max_len.saturating_sub(3) {
            self.key.push_str("...");
        } else {
            self.key.push_str(", ");
            self.key.push_str(new_key);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OverlapResult {
    pub repertoires: Vec<Repertoire>,
    pub items: Vec<OverlapResultItem>,
    pub truncated: bool,
}

pub struct Overlap<'a> {
    config: OverlapConfig,
    sorter_config: SorterConfig,
    pool: &'a WorkerPool,
}

impl<'a> Overlap<'a> {
    pub fn new(config: OverlapConfig, sorter_config: SorterConfig, pool: &'a WorkerPool) -> Self {
        Overlap {
            config,
            sorter_config,
            pool,
        }
    }

    pub fn run(
        &self,
        ctx: &ContextStore,
        names: &[String],
        key_type: KeyType,
        mode: OverlapMode,
    ) -> Result<OverlapResult> {
        if names.len() > self.config.max_repertoires {
            return Err(ClonescanError::Capacity(format!(
                "{} repertoires requested for overlap, max is {}",
                names.len(),
                self.config.max_repertoires
            )));
        }

        let mut repertoires = Vec::with_capacity(names.len());
        for name in names {
            repertoires.push(ctx.find_repertoire(name)?);
        }

        debug!(count = names.len(), "sorting repertoire keys for overlap");

        let tasks: Vec<_> = names
            .iter()
            .map(|name| {
                let spec = ctx.spec(name);
                move || -> Result<KeyStream> {
                    let sorter =
                        KeySorter::new(ctx.backing_store(), self.pool, self.sorter_config.clone());
                    sorter.sorted_keys(&spec, key_type)
                }
            })
            .collect();
        let mut streams = self.pool.run_all(tasks)?;

        let mut items = self.find_overlaps(&mut streams, mode)?;

        let mut truncated = false;
        match mode {
            OverlapMode::Standard => {
                items.sort_by(|a, b| {
                    b.max_count
                        .cmp(&a.max_count)
                        .then(b.present_in.cmp(&a.present_in))
                        .then(b.key.len().cmp(&a.key.len()))
                });

                if items.len() > self.config.max_standard_overlaps {
                    items.truncate(self.config.max_standard_overlaps);
                    truncated = true;
                }
            }
            OverlapMode::Combined => {
                items = self.combine_profiles(items);
            }
        }

        Ok(OverlapResult {
            repertoires,
            items,
            truncated,
        })
    }

    fn find_overlaps(
        &self,
        streams: &mut [KeyStream],
        mode: OverlapMode,
    ) -> Result<Vec<OverlapResultItem>> {
        let min_presence = match mode {
            OverlapMode::Standard => 2,
            OverlapMode::Combined => 1,
        };

        let mut heads = Vec::with_capacity(streams.len());
        for stream in streams.iter_mut() {
            heads.push(stream.next_item()?);
        }

        let mut items = Vec::new();
        // singletons fold by (stream, count) so a million unique keys
        // collapse into a handful of profile rows
        let mut singletons: BTreeMap<(usize, u64), OverlapResultItem> = BTreeMap::new();

        loop {
            let mut active = 0usize;
            let mut matched: Vec<usize> = Vec::new();
            let mut min_key: Option<&str> = None;

            for (i, head) in heads.iter().enumerate() {
                let Some(item) = head else { continue };
                active += 1;

                match min_key {
                    None => {
                        min_key = Some(&item.key);
                        matched.clear();
                        matched.push(i);
                    }
                    Some(current) => match item.key.as_str().cmp(current) {
                        std::cmp::Ordering::Equal => matched.push(i),
                        std::cmp::Ordering::Less => {
                            min_key = Some(&item.key);
                            matched.clear();
                            matched.push(i);
                        }
                        std::cmp::Ordering::Greater => {}
                    },
                }
            }

            if active < min_presence || matched.is_empty() {
                break;
            }

            if matched.len() > 1 {
                items.push(make_item(&heads, &matched));
            } else if mode == OverlapMode::Combined {
                let idx = matched[0];
                let count = heads[idx].as_ref().map(|i| i.count).unwrap_or(0);
                let max_len = self.config.max_combined_key_length;
                match singletons.get_mut(&(idx, count)) {
                    Some(existing) => {
                        let key = heads[idx].as_ref().map(|i| i.key.clone()).unwrap_or_default();
                        existing.append_key(&key, max_len);
                    }
                    None => {
                        singletons.insert((idx, count), make_item(&heads, &matched));
                    }
                }
            }

            for &i in &matched {
                heads[i] = streams[i].next_item()?;
            }
        }

        items.extend(singletons.into_values());
        Ok(items)
    }

    /// Fold items with identical count profiles into one row each.
    fn combine_profiles(&self, mut items: Vec<OverlapResultItem>) -> Vec<OverlapResultItem> {
        if items.is_empty() {
            return items;
        }

        items.sort_by(|a, b| a.counts.cmp(&b.counts));

        let max_len = self.config.max_combined_key_length;
        let mut combined: Vec<OverlapResultItem> = Vec::new();

        for item in items {
            match combined.last_mut() {
                Some(last) if last.counts == item.counts => {
                    last.append_key(&item.key, max_len);
                }
                _ => combined.push(item),
            }
        }

        combined
    }
}

fn make_item(
    heads: &[Option<crate::sort::KeyItem>],
    matched: &[usize],
) -> OverlapResultItem {
    let first = matched[0];
    let key = heads[first]
        .as_ref()
        .map(|i| i.key.clone())
        .unwrap_or_default();

    let mut counts = vec![0u64; heads.len()];
    let mut max_count = 0u64;
    for &i in matched {
        if let Some(item) = &heads[i] {
            counts[i] = item.count;
            max_count = max_count.max(item.count);
        }
    }

    OverlapResultItem {
        key,
        key_count: 1,
        present_in: matched.len(),
        counts,
        max_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, counts: Vec<u64>) -> OverlapResultItem {
        let max_count = counts.iter().copied().max().unwrap_or(0);
        let present_in = counts.iter().filter(|&&c| c > 0).count();
        OverlapResultItem {
            key: key.to_string(),
            key_count: 1,
            present_in,
            counts,
            max_count,
        }
    }

    #[test]
    fn test_append_key_ellipsis() {
        let mut it = item("AAAA", vec![1, 0]);

        it.append_key("CCCC", 64);
        assert_eq!(it.key, "AAAA, CCCC");
        assert_eq!(it.key_count, 2);

        // too small to hold more text
        it.append_key("GGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG", 64);
        assert!(it.key.ends_with("..."));
        assert_eq!(it.key_count, 3);

        // once full, only the counter moves
        let frozen = it.key.clone();
        it.append_key("TT", 64);
        assert_eq!(it.key, frozen);
        assert_eq!(it.key_count, 4);
    }

    #[test]
    fn test_standard_ranking_order() {
        let mut items = vec![
            item("SHORT", vec![5, 5]),
            item("AAAA", vec![100, 2]),
            item("LONGERKEY", vec![5, 5]),
            item("BBBB", vec![100, 2, 1]),
        ];

        items.sort_by(|a, b| {
            b.max_count
                .cmp(&a.max_count)
                .then(b.present_in.cmp(&a.present_in))
                .then(b.key.len().cmp(&a.key.len()))
        });

        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        // presence breaks the 100 tie, key length breaks the 5/5 tie
        assert_eq!(keys, vec!["BBBB", "AAAA", "LONGERKEY", "SHORT"]);
    }

    #[test]
    fn test_combine_profiles_groups_equal_counts() {
        let overlap = Overlap {
            config: OverlapConfig::default(),
            sorter_config: SorterConfig::default(),
            pool: &crate::exec::WorkerPool::new(1).unwrap(),
        };

        let items = vec![
            item("AAA", vec![3, 0]),
            item("CCC", vec![0, 7]),
            item("GGG", vec![3, 0]),
        ];

        let combined = overlap.combine_profiles(items);
        assert_eq!(combined.len(), 2);

        let folded = combined.iter().find(|i| i.counts == vec![3, 0]).unwrap();
        assert_eq!(folded.key, "AAA, GGG");
        assert_eq!(folded.key_count, 2);
    }
}
