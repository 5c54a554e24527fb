//! Shared fixtures: a temp-backed store and synthetic repertoire TSVs.

#![allow(dead_code)]

use clonescan::store::{FsStore, RepertoireSpec};
use clonescan::tsv::{receive, Ingest, IngestOverrides};
use tempfile::TempDir;

pub const USER: &str = "test-user";
pub const CONTEXT: &str = "test-context";

pub struct TestStore {
    pub store: FsStore,
    _dir: TempDir,
}

pub fn test_store() -> TestStore {
    let dir = TempDir::new().unwrap();
    let store = FsStore::at(dir.path()).unwrap();
    TestStore { store, _dir: dir }
}

pub fn spec(name: &str) -> RepertoireSpec {
    RepertoireSpec::new(USER, CONTEXT, name)
}

/// One synthetic data row. The CDR3 region is the middle of the sequence.
pub fn row(seq: &str, aa: &str, count: u64, v: &str, j: &str, tags: &str) -> String {
    let cdr3_len = (seq.len() / 2).max(1);
    let v_index = (seq.len() / 4) as i32;
    let j_index = v_index + cdr3_len as i32;
    format!(
        "{seq}\t{aa}\tIn\t{count}\t{v}\t\t{j}\t{cdr3_len}\t{v_index}\t-1\t{j_index}\t-1\t-1\t\t{tags}"
    )
}

pub fn doc(meta: &[&str], rows: &[String]) -> String {
    let mut out = String::new();
    for m in meta {
        out.push_str(m);
        out.push('\n');
    }
    out.push_str(
        "rearrangement\tamino_acid\tframe_type\ttemplates\tv_resolved\td_resolved\tj_resolved\t\
         cdr3_length\tv_index\td_index\tj_index\tn1_index\tn2_index\tv_shm_indexes\tsequence_tags\n",
    );
    for r in rows {
        out.push_str(r);
        out.push('\n');
    }
    out
}

pub fn ingest(store: &FsStore, name: &str, document: &str) -> clonescan::model::Repertoire {
    ingest_with(store, name, document, &IngestOverrides::default())
}

pub fn ingest_with(
    store: &FsStore,
    name: &str,
    document: &str,
    overrides: &IngestOverrides,
) -> clonescan::model::Repertoire {
    match receive(store, &spec(name), document.as_bytes(), overrides).unwrap() {
        Ingest::Ok(rep) => rep,
        Ingest::Exists => panic!("fixture repertoire {name} ingested twice"),
    }
}
