//! Ingestion: stream a TSV document into the store while accumulating the
//! repertoire summary in the same pass.
//!
//! The raw lines are mirrored byte-for-byte into the store stream by the
//! reader's line peeker, so the persisted file is exactly what arrived.
//! Any failure mid-stream deletes the partial repertoire before the error
//! propagates.

use crate::model::Repertoire;
use crate::store::{RepertoireSpec, RepertoireStore};
use crate::tsv::Reader;
use crate::Result;
use chrono::NaiveDate;
use std::io::{BufWriter, Read, Write};
use tracing::{debug, info};

/// Outcome of an ingestion attempt. Re-ingesting an existing name is a
/// normal condition callers branch on, not an error.
#[derive(Debug)]
pub enum Ingest {
    Ok(Repertoire),
    Exists,
}

/// Caller-supplied summary fields that win over anything discovered in the
/// file's metadata.
#[derive(Debug, Default, Clone)]
pub struct IngestOverrides {
    pub total_cells: Option<u64>,
    pub milliliters: Option<f64>,
    pub date: Option<NaiveDate>,
}

pub fn receive(
    store: &dyn RepertoireStore,
    spec: &RepertoireSpec,
    input: impl Read,
    overrides: &IngestOverrides,
) -> Result<Ingest> {
    let Some(raw) = store.repertoire_writer(spec)? else {
        debug!(repertoire = %spec, "ingest skipped, already exists");
        return Ok(Ingest::Exists);
    };

    match ingest_stream(spec, input, overrides, raw) {
        Ok(rep) => {
            store.commit_repertoire(&spec.user_id, &spec.context, rep.clone())?;
            info!(
                repertoire = %spec,
                uniques = rep.total_uniques,
                templates = rep.total_count,
                "ingested repertoire"
            );
            Ok(Ingest::Ok(rep))
        }
        Err(e) => {
            // best effort, the original failure is what matters
            if let Err(cleanup) = store.delete_repertoire(spec) {
                debug!(repertoire = %spec, error = %cleanup, "cleanup after failed ingest");
            }
            Err(e)
        }
    }
}

fn ingest_stream(
    spec: &RepertoireSpec,
    input: impl Read,
    overrides: &IngestOverrides,
    raw: Box<dyn Write + Send>,
) -> Result<Repertoire> {
    let mut writer = BufWriter::new(raw);
    let mut rep = Repertoire::new(&spec.name);
    rep.date = overrides.date;

    let (discovered_cells, discovered_ml) = {
        let mut reader = Reader::with_peeker(
            input,
            0,
            Box::new(|line: &str| {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")
            }),
        );

        while let Some(r) = reader.read_next()? {
            rep.accumulate(r.locus, r.count);
        }

        (reader.discovered_cell_count(), reader.discovered_milliliters())
    };

    rep.total_cells = overrides.total_cells.or(discovered_cells).unwrap_or(0);
    rep.total_milliliters = overrides.milliliters.or(discovered_ml).unwrap_or(0.0);

    writer.flush()?;
    Ok(rep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocusGroup;
    use crate::store::FsStore;
    use tempfile::TempDir;

    const DOC: &str = "#estTotalNucleatedCells=1000\n\
        rearrangement\tamino_acid\tframe_type\ttemplates\tv_resolved\tj_resolved\tcdr3_length\tv_index\tj_index\n\
        ACGTACGT\tCASS\tIn\t12\tTCRBV05-01\tTCRBJ02-01\t4\t2\t6\n\
        GGGGCCCC\tCAWS\tOut\t3\tIGHV03-02\tIGHJ01-01\t4\t1\t5\n";

    fn temp_store() -> (TempDir, FsStore) {
        let dir = TempDir::new().unwrap();
        let store = FsStore::at(dir.path()).unwrap();
        (dir, store)
    }

    fn spec() -> RepertoireSpec {
        RepertoireSpec::new("alice", "trial-1", "sample-a")
    }

    #[test]
    fn test_receive_accumulates_and_commits() {
        let (_dir, store) = temp_store();

        let out = receive(&store, &spec(), DOC.as_bytes(), &IngestOverrides::default()).unwrap();
        let Ingest::Ok(rep) = out else {
            panic!("expected a fresh ingest");
        };

        assert_eq!(rep.total_count, 15);
        assert_eq!(rep.total_uniques, 2);
        assert_eq!(rep.total_cells, 1000);
        assert_eq!(rep.locus_counts[&LocusGroup::Tcrb], 12);
        assert_eq!(rep.locus_counts[&LocusGroup::Igh], 3);

        let listed = store.context_repertoires("alice", "trial-1").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].total_count, 15);
    }

    #[test]
    fn test_receive_mirrors_bytes() {
        let (_dir, store) = temp_store();
        receive(&store, &spec(), DOC.as_bytes(), &IngestOverrides::default()).unwrap();

        let mut stored = String::new();
        store
            .repertoire_reader(&spec())
            .unwrap()
            .read_to_string(&mut stored)
            .unwrap();
        assert_eq!(stored, DOC);
    }

    #[test]
    fn test_receive_existing_name() {
        let (_dir, store) = temp_store();

        receive(&store, &spec(), DOC.as_bytes(), &IngestOverrides::default()).unwrap();
        let second = receive(&store, &spec(), DOC.as_bytes(), &IngestOverrides::default()).unwrap();
        assert!(matches!(second, Ingest::Exists));

        // the original data is untouched
        assert_eq!(store.context_repertoires("alice", "trial-1").unwrap().len(), 1);
    }

    #[test]
    fn test_overrides_win() {
        let (_dir, store) = temp_store();

        let overrides = IngestOverrides {
            total_cells: Some(42),
            milliliters: Some(1.5),
            date: NaiveDate::from_ymd_opt(2024, 6, 1),
        };
        let Ingest::Ok(rep) = receive(&store, &spec(), DOC.as_bytes(), &overrides).unwrap() else {
            panic!("expected a fresh ingest");
        };

        assert_eq!(rep.total_cells, 42);
        assert_eq!(rep.total_milliliters, 1.5);
        assert_eq!(rep.date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert!(rep.is_cellfree());
    }

    #[test]
    fn test_failed_ingest_leaves_nothing() {
        let (_dir, store) = temp_store();

        let bad = "rearrangement\tamino_acid\tframe_type\ttemplates\tv_resolved\tj_resolved\n\
                   ACGT\tCA\tIn\tbogus\tTCRBV01\tTCRBJ01\n";
        assert!(receive(&store, &spec(), bad.as_bytes(), &IngestOverrides::default()).is_err());

        assert!(store.context_repertoires("alice", "trial-1").unwrap().is_empty());
        assert!(store.repertoire_reader(&spec()).is_err());
    }
}
