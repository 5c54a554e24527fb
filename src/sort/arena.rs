//! Tracking for the temp files a sort produces.
//!
//! Every spill and merge output is registered here, so cleanup on any exit
//! path is a single sweep instead of per-call-site bookkeeping. The backing
//! directory is reference counted; a survivor file handed to a stream keeps
//! the directory alive after the arena itself is gone.

use crate::Result;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

pub struct TempArena {
    dir: Arc<TempDir>,
    counter: AtomicUsize,
    files: Mutex<Vec<PathBuf>>,
}

impl TempArena {
    pub fn new() -> Result<Self> {
        Ok(Self::from_dir(TempDir::new()?))
    }

    pub fn in_dir(base: &Path) -> Result<Self> {
        Ok(Self::from_dir(TempDir::new_in(base)?))
    }

    fn from_dir(dir: TempDir) -> Self {
        TempArena {
            dir: Arc::new(dir),
            counter: AtomicUsize::new(0),
            files: Mutex::new(Vec::new()),
        }
    }

    /// Reserve and track a fresh file path. Nothing is created on disk
    /// until the caller writes to it.
    pub fn create(&self) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.path().join(format!("keys-{:05}.tsv", n));
        self.files.lock().push(path.clone());
        path
    }

    /// Delete a consumed intermediate and stop tracking it.
    pub fn discard(&self, path: &Path) {
        self.files.lock().retain(|p| p != path);
        if let Err(e) = std::fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "discarding temp file");
        }
    }

    /// Stop tracking a file without deleting it, for hand-off to a caller.
    pub fn release(&self, path: &Path) {
        self.files.lock().retain(|p| p != path);
    }

    /// Drain the tracked set, leaving the arena empty.
    pub fn take_all(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.files.lock())
    }

    /// Handle that keeps the backing directory alive.
    pub fn dir_handle(&self) -> Arc<TempDir> {
        Arc::clone(&self.dir)
    }
}

impl Drop for TempArena {
    fn drop(&mut self) {
        for path in self.take_all() {
            let _ = std::fs::remove_file(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_create_paths_are_unique() {
        let arena = TempArena::new().unwrap();
        let a = arena.create();
        let b = arena.create();
        assert_ne!(a, b);
        assert_eq!(arena.take_all().len(), 2);
    }

    #[test]
    fn test_drop_removes_tracked_files() {
        let arena = TempArena::new().unwrap();
        let keep_dir = arena.dir_handle();

        let tracked = arena.create();
        fs::write(&tracked, b"x").unwrap();

        let released = arena.create();
        fs::write(&released, b"y").unwrap();
        arena.release(&released);

        drop(arena);
        assert!(!tracked.exists());
        assert!(released.exists());
        drop(keep_dir);
        assert!(!released.exists());
    }

    #[test]
    fn test_discard_removes_immediately() {
        let arena = TempArena::new().unwrap();
        let path = arena.create();
        fs::write(&path, b"x").unwrap();

        arena.discard(&path);
        assert!(!path.exists());
        assert!(arena.take_all().is_empty());
    }
}
