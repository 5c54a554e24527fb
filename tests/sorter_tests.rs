mod common;

use clonescan::exec::WorkerPool;
use clonescan::keys::KeyType;
use clonescan::sort::{KeyItem, KeySorter, SorterConfig};
use clonescan::store::RepertoireStore;
use common::{doc, ingest, row, spec, test_store};
use pretty_assertions::assert_eq;

/// 10 rows over 7 unique sequences, with duplicates carrying extra counts.
fn fixture_rows() -> Vec<String> {
    vec![
        row("ACGTACGTACGT", "CASS", 10, "TCRBV05-01", "TCRBJ02-01", ""),
        row("TTTTACGTCCCC", "CAWS", 5, "TCRBV07-02", "TCRBJ01-01", ""),
        row("ACGTACGTACGT", "CASS", 7, "TCRBV05-01", "TCRBJ02-01", ""),
        row("GGGGGGGGGGGG", "CGGG", 1, "TCRBV12-03", "TCRBJ02-07", ""),
        row("AAAACCCCGGGG", "CAPG", 3, "TCRBV06-01", "TCRBJ02-01", ""),
        row("TTTTACGTCCCC", "CAWS", 2, "TCRBV07-02", "TCRBJ01-01", ""),
        row("CCCCTTTTAAAA", "CPFK", 8, "TCRBV28-01", "TCRBJ01-02", ""),
        row("ACACACACACAC", "CTHT", 4, "TCRBV09-01", "TCRBJ02-03", ""),
        row("GTGTGTGTGTGT", "CVCV", 6, "TCRBV19-01", "TCRBJ02-05", ""),
        row("ACGTACGTACGT", "CASS", 1, "TCRBV05-01", "TCRBJ02-01", ""),
    ]
}

fn collect(
    store: &dyn RepertoireStore,
    pool: &WorkerPool,
    config: SorterConfig,
    name: &str,
    key_type: KeyType,
) -> Vec<KeyItem> {
    let sorter = KeySorter::new(store, pool, config);
    let mut stream = sorter.sorted_keys(&spec(name), key_type).unwrap();

    let mut items = Vec::new();
    while let Some(item) = stream.next_item().unwrap() {
        items.push(item);
    }
    items
}

fn no_cache(chunk_size: usize) -> SorterConfig {
    SorterConfig {
        chunk_size,
        use_cache: false,
        working_dir: None,
    }
}

#[test]
fn test_sorted_dedup_sums_counts() {
    let ts = test_store();
    ingest(&ts.store, "r1", &doc(&[], &fixture_rows()));
    let pool = WorkerPool::new(2).unwrap();

    let items = collect(&ts.store, &pool, no_cache(4), "r1", KeyType::Rearrangement);

    assert_eq!(items.len(), 7);
    let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted, "stream must be key-sorted");

    let dup = items.iter().find(|i| i.key == "ACGTACGTACGT").unwrap();
    assert_eq!(dup.count, 18);
}

#[test]
fn test_chunk_size_invariance() {
    // above, below, and non-divisibly below the unique-key count
    let ts = test_store();
    ingest(&ts.store, "r1", &doc(&[], &fixture_rows()));
    let pool = WorkerPool::new(2).unwrap();

    let reference = collect(&ts.store, &pool, no_cache(1000), "r1", KeyType::Rearrangement);
    for chunk_size in [1, 2, 3, 5, 7] {
        let items = collect(
            &ts.store,
            &pool,
            no_cache(chunk_size),
            "r1",
            KeyType::Rearrangement,
        );
        assert_eq!(items, reference, "chunk size {chunk_size} changed output");
    }
}

#[test]
fn test_count_conservation() {
    let ts = test_store();
    ingest(&ts.store, "r1", &doc(&[], &fixture_rows()));
    let pool = WorkerPool::new(2).unwrap();

    let input_total: u64 = [10, 5, 7, 1, 3, 2, 8, 4, 6, 1].iter().sum();
    let items = collect(&ts.store, &pool, no_cache(3), "r1", KeyType::Rearrangement);
    let output_total: u64 = items.iter().map(|i| i.count).sum();

    assert_eq!(output_total, input_total);
}

#[test]
fn test_empty_keys_skipped() {
    // rows with no CDR3 call vanish from a cdr3-keyed sort
    let ts = test_store();
    let mut rows = fixture_rows();
    rows.push("ACGT\tCA\tIn\t99\tTCRBV01\t\tTCRBJ01\t-1\t-1\t-1\t-1\t-1\t-1\t\t".to_string());
    ingest(&ts.store, "r1", &doc(&[], &rows));
    let pool = WorkerPool::new(2).unwrap();

    let items = collect(&ts.store, &pool, no_cache(4), "r1", KeyType::Cdr3);
    let output_total: u64 = items.iter().map(|i| i.count).sum();

    assert_eq!(output_total, 47, "the keyless row must not contribute");
}

#[test]
fn test_cache_round_trip() {
    let ts = test_store();
    ingest(&ts.store, "r1", &doc(&[], &fixture_rows()));
    let pool = WorkerPool::new(2).unwrap();

    let cached_config = SorterConfig {
        chunk_size: 4,
        use_cache: true,
        working_dir: None,
    };

    let first = collect(&ts.store, &pool, cached_config.clone(), "r1", KeyType::Rearrangement);

    // the sorted result landed in the secondary store
    assert!(ts
        .store
        .secondary_reader(&spec("r1"), "keysort-rearrangement")
        .unwrap()
        .is_some());

    let second = collect(&ts.store, &pool, cached_config, "r1", KeyType::Rearrangement);
    assert_eq!(second, first);

    // other key types miss the cache
    assert!(ts
        .store
        .secondary_reader(&spec("r1"), "keysort-cdr3")
        .unwrap()
        .is_none());
}

#[test]
fn test_empty_repertoire_yields_empty_stream() {
    let ts = test_store();
    ingest(&ts.store, "empty", &doc(&[], &[]));
    let pool = WorkerPool::new(1).unwrap();

    let items = collect(&ts.store, &pool, no_cache(4), "empty", KeyType::Rearrangement);
    assert!(items.is_empty());
}
