//! Chunked external sort with parallel pairwise merging.

use crate::exec::WorkerPool;
use crate::keys::KeyType;
use crate::sort::{KeyItem, KeyReader, KeyWriter, TempArena};
use crate::store::{RepertoireSpec, RepertoireStore};
use crate::tsv;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};

fn default_chunk_size() -> usize {
    65_536
}

fn default_use_cache() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorterConfig {
    /// Rows sorted in memory per spill file.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Reuse and write back the per-repertoire sorted-keys cache.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Spill directory; the system temp dir when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for SorterConfig {
    fn default() -> Self {
        SorterConfig {
            chunk_size: default_chunk_size(),
            use_cache: default_use_cache(),
            working_dir: None,
        }
    }
}

/// Sorted unique keys with summed counts, consumed once, front to back.
pub struct KeyStream {
    reader: KeyReader,
    _dir: Option<Arc<TempDir>>,
}

impl KeyStream {
    fn from_reader(input: Box<dyn std::io::Read + Send>) -> Self {
        KeyStream {
            reader: KeyReader::new(input),
            _dir: None,
        }
    }

    fn from_file(dir: Arc<TempDir>, path: &Path) -> Result<Self> {
        Ok(KeyStream {
            reader: KeyReader::open(path)?,
            _dir: Some(dir),
        })
    }

    pub fn next_item(&mut self) -> Result<Option<KeyItem>> {
        self.reader.next()
    }
}

pub struct KeySorter<'a> {
    store: &'a dyn RepertoireStore,
    pool: &'a WorkerPool,
    config: SorterConfig,
}

impl<'a> KeySorter<'a> {
    pub fn new(store: &'a dyn RepertoireStore, pool: &'a WorkerPool, config: SorterConfig) -> Self {
        KeySorter {
            store,
            pool,
            config,
        }
    }

    /// Produce the sorted unique keys of one repertoire. Rows with an empty
    /// key (e.g. no CDR3 call) are dropped; counts of duplicate keys are
    /// summed. Cache failures in either direction degrade to a fresh sort.
    pub fn sorted_keys(&self, spec: &RepertoireSpec, key_type: KeyType) -> Result<KeyStream> {
        let cache_key = format!("keysort-{}", key_type.cache_id());

        if self.config.use_cache {
            match self.store.secondary_reader(spec, &cache_key) {
                Ok(Some(input)) => {
                    debug!(repertoire = %spec, key = %cache_key, "sorted keys from cache");
                    return Ok(KeyStream::from_reader(input));
                }
                Ok(None) => {}
                Err(e) => warn!(repertoire = %spec, error = %e, "key cache read failed"),
            }
        }

        let arena = match self.config.working_dir.as_deref() {
            Some(dir) => TempArena::in_dir(dir)?,
            None => TempArena::new()?,
        };

        let survivor = self.run_sort(spec, key_type, &arena)?;

        if self.config.use_cache {
            self.save_cache(spec, &cache_key, &survivor);
        }

        arena.release(&survivor);
        KeyStream::from_file(arena.dir_handle(), &survivor)
    }

    fn run_sort(&self, spec: &RepertoireSpec, key_type: KeyType, arena: &TempArena) -> Result<PathBuf> {
        let mut chunks = self.spill_chunks(spec, key_type, arena)?;

        if chunks.is_empty() {
            // empty repertoire still yields a valid (empty) stream
            let path = arena.create();
            File::create(&path)?;
            return Ok(path);
        }

        let mut round = 0usize;
        while chunks.len() > 1 {
            round += 1;
            let straggler = if chunks.len() % 2 == 1 {
                chunks.pop()
            } else {
                None
            };

            let mut pairs = Vec::with_capacity(chunks.len() / 2);
            let mut it = chunks.into_iter();
            while let (Some(a), Some(b)) = (it.next(), it.next()) {
                pairs.push((a, b));
            }

            let tasks: Vec<_> = pairs
                .into_iter()
                .map(|(a, b)| {
                    move || -> Result<PathBuf> {
                        let out = arena.create();
                        merge_two(&a, &b, &out)?;
                        arena.discard(&a);
                        arena.discard(&b);
                        Ok(out)
                    }
                })
                .collect();

            let mut merged = self.pool.run_all(tasks)?;
            if let Some(s) = straggler {
                merged.push(s);
            }

            debug!(repertoire = %spec, round, files = merged.len(), "merge round complete");
            chunks = merged;
        }

        Ok(chunks.remove(0))
    }

    fn spill_chunks(
        &self,
        spec: &RepertoireSpec,
        key_type: KeyType,
        arena: &TempArena,
    ) -> Result<Vec<PathBuf>> {
        let input = self.store.repertoire_reader(spec)?;
        let mut reader = tsv::Reader::new(input, 0);
        let chunk_size = self.config.chunk_size.max(1);

        let mut chunks = Vec::new();
        loop {
            let batch = reader.read_batch(chunk_size)?;
            if batch.is_empty() {
                break;
            }

            let mut items: Vec<KeyItem> = batch
                .iter()
                .filter(|r| !key_type.extract(r).is_empty())
                .map(|r| KeyItem::new(key_type.extract(r), r.count))
                .collect();
            if items.is_empty() {
                continue;
            }

            items.sort_unstable_by(|a, b| a.key.cmp(&b.key));

            let path = arena.create();
            let mut writer = KeyWriter::create(&path)?;
            let mut pending: Option<KeyItem> = None;
            for item in items {
                match &mut pending {
                    Some(p) if p.key == item.key => p.count += item.count,
                    Some(p) => {
                        writer.write(p)?;
                        pending = Some(item);
                    }
                    None => pending = Some(item),
                }
            }
            if let Some(p) = pending {
                writer.write(&p)?;
            }
            writer.finish()?;
            chunks.push(path);
        }

        Ok(chunks)
    }

    fn save_cache(&self, spec: &RepertoireSpec, cache_key: &str, path: &Path) {
        let attempt = || -> Result<bool> {
            let Some(mut writer) = self.store.secondary_writer(spec, cache_key)? else {
                return Ok(false);
            };
            let mut file = File::open(path)?;
            std::io::copy(&mut file, &mut writer)?;
            Ok(true)
        };

        match attempt() {
            Ok(true) => debug!(repertoire = %spec, key = %cache_key, "key cache saved"),
            Ok(false) => {}
            Err(e) => warn!(repertoire = %spec, error = %e, "key cache save failed"),
        }
    }
}

fn merge_two(a: &Path, b: &Path, out: &Path) -> Result<()> {
    let mut ra = KeyReader::open(a)?;
    let mut rb = KeyReader::open(b)?;
    let mut writer = KeyWriter::create(out)?;

    let mut ia = ra.next()?;
    let mut ib = rb.next()?;

    loop {
        match (ia.take(), ib.take()) {
            (Some(x), Some(y)) => match x.key.cmp(&y.key) {
                Ordering::Less => {
                    writer.write(&x)?;
                    ia = ra.next()?;
                    ib = Some(y);
                }
                Ordering::Greater => {
                    writer.write(&y)?;
                    ib = rb.next()?;
                    ia = Some(x);
                }
                Ordering::Equal => {
                    writer.write(&KeyItem::new(x.key, x.count + y.count))?;
                    ia = ra.next()?;
                    ib = rb.next()?;
                }
            },
            (Some(x), None) => {
                writer.write(&x)?;
                ia = ra.next()?;
            }
            (None, Some(y)) => {
                writer.write(&y)?;
                ib = rb.next()?;
            }
            (None, None) => break,
        }
    }

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_keys(arena: &TempArena, items: &[(&str, u64)]) -> PathBuf {
        let path = arena.create();
        let mut w = KeyWriter::create(&path).unwrap();
        for (key, count) in items {
            w.write(&KeyItem::new(*key, *count)).unwrap();
        }
        w.finish().unwrap();
        path
    }

    fn read_all(path: &Path) -> Vec<KeyItem> {
        let mut reader = KeyReader::open(path).unwrap();
        let mut items = Vec::new();
        while let Some(item) = reader.next().unwrap() {
            items.push(item);
        }
        items
    }

    #[test]
    fn test_merge_two_sums_duplicates() {
        let arena = TempArena::new().unwrap();
        let a = write_keys(&arena, &[("AAA", 1), ("CCC", 2), ("GGG", 3)]);
        let b = write_keys(&arena, &[("CCC", 10), ("TTT", 4)]);
        let out = arena.create();

        merge_two(&a, &b, &out).unwrap();

        assert_eq!(
            read_all(&out),
            vec![
                KeyItem::new("AAA", 1),
                KeyItem::new("CCC", 12),
                KeyItem::new("GGG", 3),
                KeyItem::new("TTT", 4),
            ]
        );
    }

    #[test]
    fn test_merge_two_with_empty_side() {
        let arena = TempArena::new().unwrap();
        let a = write_keys(&arena, &[("AAA", 1)]);
        let b = arena.create();
        fs::write(&b, b"").unwrap();
        let out = arena.create();

        merge_two(&a, &b, &out).unwrap();
        assert_eq!(read_all(&out), vec![KeyItem::new("AAA", 1)]);
    }
}
