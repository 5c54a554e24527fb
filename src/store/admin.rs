//! Administrative operations that move repertoires between contexts by
//! re-running ingestion, so the destination gets a freshly validated copy
//! and its own summary entry.

use crate::model::Repertoire;
use crate::store::{RepertoireSpec, RepertoireStore};
use crate::tsv::{receive, Ingest, IngestOverrides};
use crate::{ClonescanError, Result};
use tracing::info;

/// Copy one repertoire into another user/context/name. Summary fields that
/// came from ingestion overrides rather than the file itself are carried
/// across explicitly.
pub fn copy_repertoire(
    store: &dyn RepertoireStore,
    from: &RepertoireSpec,
    to: &RepertoireSpec,
) -> Result<Ingest> {
    let reps = store.context_repertoires(&from.user_id, &from.context)?;
    let source = Repertoire::find(&reps, &from.name)
        .ok_or_else(|| ClonescanError::NotFound(from.to_string()))?;

    let overrides = IngestOverrides {
        total_cells: Some(source.total_cells),
        milliliters: if source.total_milliliters > 0.0 {
            Some(source.total_milliliters)
        } else {
            None
        },
        date: source.date,
    };

    let input = store.repertoire_reader(from)?;
    let outcome = receive(store, to, input, &overrides)?;
    if matches!(outcome, Ingest::Ok(_)) {
        info!(from = %from, to = %to, "copied repertoire");
    }
    Ok(outcome)
}

/// Copy then delete the source. A name collision at the destination leaves
/// the source untouched.
pub fn move_repertoire(
    store: &dyn RepertoireStore,
    from: &RepertoireSpec,
    to: &RepertoireSpec,
) -> Result<Ingest> {
    let outcome = copy_repertoire(store, from, to)?;
    if matches!(outcome, Ingest::Ok(_)) {
        store.delete_repertoire(from)?;
        info!(from = %from, "removed source after move");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsStore;
    use std::io::Read;
    use tempfile::TempDir;

    const DOC: &str = "#estTotalNucleatedCells=250\n\
        rearrangement\tamino_acid\tframe_type\ttemplates\tv_resolved\tj_resolved\n\
        ACGT\tCA\tIn\t9\tTCRBV01\tTCRBJ01\n";

    fn seeded() -> (TempDir, FsStore, RepertoireSpec) {
        let dir = TempDir::new().unwrap();
        let store = FsStore::at(dir.path()).unwrap();
        let spec = RepertoireSpec::new("alice", "src-ctx", "s1");
        receive(&store, &spec, DOC.as_bytes(), &IngestOverrides::default()).unwrap();
        (dir, store, spec)
    }

    #[test]
    fn test_copy_preserves_summary_and_bytes() {
        let (_dir, store, from) = seeded();
        let to = RepertoireSpec::new("bob", "dst-ctx", "s1-copy");

        let Ingest::Ok(rep) = copy_repertoire(&store, &from, &to).unwrap() else {
            panic!("expected a fresh copy");
        };
        assert_eq!(rep.total_cells, 250);
        assert_eq!(rep.total_count, 9);

        let mut bytes = String::new();
        store
            .repertoire_reader(&to)
            .unwrap()
            .read_to_string(&mut bytes)
            .unwrap();
        assert_eq!(bytes, DOC);

        // source still present
        assert!(store.repertoire_reader(&from).is_ok());
    }

    #[test]
    fn test_copy_missing_source() {
        let (_dir, store, _) = seeded();
        let from = RepertoireSpec::new("alice", "src-ctx", "nope");
        let to = RepertoireSpec::new("alice", "src-ctx", "dst");
        assert!(matches!(
            copy_repertoire(&store, &from, &to),
            Err(ClonescanError::NotFound(_))
        ));
    }

    #[test]
    fn test_move_deletes_source() {
        let (_dir, store, from) = seeded();
        let to = RepertoireSpec::new("alice", "dst-ctx", "s1");

        let outcome = move_repertoire(&store, &from, &to).unwrap();
        assert!(matches!(outcome, Ingest::Ok(_)));

        assert!(store.repertoire_reader(&from).is_err());
        assert!(store.repertoire_reader(&to).is_ok());
    }

    #[test]
    fn test_move_collision_keeps_source() {
        let (_dir, store, from) = seeded();
        let to = RepertoireSpec::new("alice", "dst-ctx", "s1");
        receive(&store, &to, DOC.as_bytes(), &IngestOverrides::default()).unwrap();

        let outcome = move_repertoire(&store, &from, &to).unwrap();
        assert!(matches!(outcome, Ingest::Exists));
        assert!(store.repertoire_reader(&from).is_ok());
    }
}
