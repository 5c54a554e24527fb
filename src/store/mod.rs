pub mod admin;
pub mod context;
pub mod fs;
pub mod spec;

pub use context::ContextStore;
pub use fs::FsStore;
pub use spec::RepertoireSpec;

use crate::model::Repertoire;
use crate::Result;
use std::io::{Read, Write};

/// Capability interface over repertoire persistence.
///
/// Implementations perform their own ownership checks; callers assume any
/// stream handed back already belongs to the requested user and context.
pub trait RepertoireStore: Send + Sync {
    /// Context names owned by a user.
    fn user_contexts(&self, user_id: &str) -> Result<Vec<String>>;

    /// Summaries of every repertoire committed to a context. An unknown
    /// context is an empty list, not an error.
    fn context_repertoires(&self, user_id: &str, context: &str) -> Result<Vec<Repertoire>>;

    /// Open the raw TSV byte stream for one repertoire.
    fn repertoire_reader(&self, spec: &RepertoireSpec) -> Result<Box<dyn Read + Send>>;

    /// Open a write-once stream for ingestion. `None` means a repertoire
    /// with this name already exists.
    fn repertoire_writer(&self, spec: &RepertoireSpec) -> Result<Option<Box<dyn Write + Send>>>;

    /// Add a summary to the context index.
    fn commit_repertoire(&self, user_id: &str, context: &str, rep: Repertoire) -> Result<()>;

    /// Remove a repertoire, its index entry, and its secondary files.
    fn delete_repertoire(&self, spec: &RepertoireSpec) -> Result<()>;

    /// Open a secondary (cache) stream by opaque key; `None` on miss.
    fn secondary_reader(
        &self,
        spec: &RepertoireSpec,
        key: &str,
    ) -> Result<Option<Box<dyn Read + Send>>>;

    /// Open a secondary save stream; `None` when the backend has no cache.
    fn secondary_writer(
        &self,
        spec: &RepertoireSpec,
        key: &str,
    ) -> Result<Option<Box<dyn Write + Send>>>;

    fn delete_secondary_files(&self, spec: &RepertoireSpec) -> Result<()>;
}
