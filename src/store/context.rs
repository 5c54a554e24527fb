use crate::model::Repertoire;
use crate::store::{RepertoireSpec, RepertoireStore};
use crate::{ClonescanError, Result};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::path::Path;

/// A (user, context) view over a store, with the summary list fetched once
/// and cached for the life of the view. Every analysis operation works
/// against one of these.
pub struct ContextStore<'a> {
    store: &'a dyn RepertoireStore,
    user_id: String,
    context: String,
    cached: Mutex<Option<Vec<Repertoire>>>,
}

impl<'a> ContextStore<'a> {
    pub fn new(store: &'a dyn RepertoireStore, user_id: &str, context: &str) -> Self {
        ContextStore {
            store,
            user_id: user_id.to_string(),
            context: context.to_string(),
            cached: Mutex::new(None),
        }
    }

    pub fn spec(&self, name: &str) -> RepertoireSpec {
        RepertoireSpec::new(&self.user_id, &self.context, name)
    }

    pub fn backing_store(&self) -> &'a dyn RepertoireStore {
        self.store
    }

    pub fn repertoires(&self) -> Result<Vec<Repertoire>> {
        let mut cached = self.cached.lock();
        if cached.is_none() {
            *cached = Some(self.store.context_repertoires(&self.user_id, &self.context)?);
        }
        Ok(cached.as_ref().map(Vec::clone).unwrap_or_default())
    }

    /// A repertoire absent from the context is a request-level failure.
    pub fn find_repertoire(&self, name: &str) -> Result<Repertoire> {
        let reps = self.repertoires()?;
        Repertoire::find(&reps, name).cloned().ok_or_else(|| {
            ClonescanError::NotFound(format!(
                "repertoire {} in {}/{}",
                name, self.user_id, self.context
            ))
        })
    }

    pub fn open_repertoire(&self, name: &str) -> Result<Box<dyn Read + Send>> {
        self.store.repertoire_reader(&self.spec(name))
    }

    pub fn open_secondary(&self, name: &str, key: &str) -> Result<Option<Box<dyn Read + Send>>> {
        self.store.secondary_reader(&self.spec(name), key)
    }

    /// Copy a finished file into the secondary cache. A backend without
    /// cache support (writer `None`) is fine; the caller treats failures
    /// here as non-fatal.
    pub fn save_secondary_file(&self, name: &str, key: &str, path: &Path) -> Result<()> {
        let Some(mut writer) = self.store.secondary_writer(&self.spec(name), key)? else {
            return Ok(());
        };

        let mut file = std::fs::File::open(path)?;
        copy_all(&mut file, writer.as_mut())?;
        Ok(())
    }
}

fn copy_all(reader: &mut dyn Read, writer: &mut dyn Write) -> Result<()> {
    std::io::copy(reader, writer)?;
    writer.flush()?;
    Ok(())
}
