//! Filesystem-tree implementation of the repertoire store.
//!
//! Layout under the base directory:
//! `<clean(user)>_<sha256(user)>/<context>/context.json` is the summary
//! index, `<clean(name)>.tsv` beside it holds the raw data, and
//! `<clean(name)>__cache/<key>` holds secondary files. The user directory
//! embeds a hash so that distinct user ids which sanitize to the same
//! string cannot share a directory.

use crate::model::Repertoire;
use crate::store::{RepertoireSpec, RepertoireStore};
use crate::utils::{clean_name, sha256_hex};
use crate::{ClonescanError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const TSV_EXT: &str = ".tsv";
const CACHE_SUFFIX: &str = "__cache";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsStoreConfig {
    pub base_path: PathBuf,
    pub context_file_name: String,
}

impl Default for FsStoreConfig {
    fn default() -> Self {
        FsStoreConfig {
            base_path: PathBuf::from("."),
            context_file_name: "context.json".to_string(),
        }
    }
}

pub struct FsStore {
    cfg: FsStoreConfig,
}

impl FsStore {
    pub fn new(cfg: FsStoreConfig) -> Result<Self> {
        fs::create_dir_all(&cfg.base_path)?;
        Ok(FsStore { cfg })
    }

    pub fn at<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        Self::new(FsStoreConfig {
            base_path: base_path.as_ref().to_path_buf(),
            ..FsStoreConfig::default()
        })
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.cfg
            .base_path
            .join(format!("{}_{}", clean_name(user_id), sha256_hex(user_id)))
    }

    fn context_dir(&self, user_id: &str, context: &str) -> PathBuf {
        self.user_dir(user_id).join(context)
    }

    fn context_file(&self, user_id: &str, context: &str) -> PathBuf {
        self.context_dir(user_id, context)
            .join(&self.cfg.context_file_name)
    }

    fn repertoire_file(&self, spec: &RepertoireSpec) -> PathBuf {
        self.context_dir(&spec.user_id, &spec.context)
            .join(format!("{}{}", clean_name(&spec.name), TSV_EXT))
    }

    fn cache_dir(&self, spec: &RepertoireSpec) -> PathBuf {
        self.context_dir(&spec.user_id, &spec.context)
            .join(format!("{}{}", clean_name(&spec.name), CACHE_SUFFIX))
    }

    fn save_index(&self, user_id: &str, context: &str, reps: &[Repertoire]) -> Result<()> {
        fs::create_dir_all(self.context_dir(user_id, context))?;
        let json = serde_json::to_string_pretty(reps)
            .map_err(|e| ClonescanError::Store(format!("index serialize: {}", e)))?;
        fs::write(self.context_file(user_id, context), json)?;
        Ok(())
    }
}

impl RepertoireStore for FsStore {
    fn user_contexts(&self, user_id: &str) -> Result<Vec<String>> {
        let dir = self.user_dir(user_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut contexts = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                contexts.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        contexts.sort();
        Ok(contexts)
    }

    fn context_repertoires(&self, user_id: &str, context: &str) -> Result<Vec<Repertoire>> {
        let path = self.context_file(user_id, context);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&json)
            .map_err(|e| ClonescanError::Store(format!("index parse {}: {}", path.display(), e)))
    }

    fn repertoire_reader(&self, spec: &RepertoireSpec) -> Result<Box<dyn Read + Send>> {
        let path = self.repertoire_file(spec);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ClonescanError::NotFound(format!("repertoire {}", spec))
            } else {
                e.into()
            }
        })?;
        Ok(Box::new(file))
    }

    fn repertoire_writer(&self, spec: &RepertoireSpec) -> Result<Option<Box<dyn Write + Send>>> {
        fs::create_dir_all(self.context_dir(&spec.user_id, &spec.context))?;
        let path = self.repertoire_file(spec);

        if path.exists() {
            warn!(spec = %spec, "repertoire file already exists, name collision?");
            return Ok(None);
        }

        Ok(Some(Box::new(File::create(path)?)))
    }

    fn commit_repertoire(&self, user_id: &str, context: &str, rep: Repertoire) -> Result<()> {
        let mut reps = self.context_repertoires(user_id, context)?;
        reps.push(rep);
        self.save_index(user_id, context, &reps)
    }

    fn delete_repertoire(&self, spec: &RepertoireSpec) -> Result<()> {
        let reps = self.context_repertoires(&spec.user_id, &spec.context)?;
        let remaining: Vec<Repertoire> =
            reps.into_iter().filter(|r| r.name != spec.name).collect();

        if remaining.is_empty() {
            // last repertoire takes the whole context directory with it
            let _ = fs::remove_file(self.repertoire_file(spec));
            if let Err(e) = fs::remove_dir_all(self.context_dir(&spec.user_id, &spec.context)) {
                warn!(spec = %spec, error = %e, "context dir delete (non-fatal)");
            }
        } else {
            self.save_index(&spec.user_id, &spec.context, &remaining)?;
            fs::remove_file(self.repertoire_file(spec))?;
            self.delete_secondary_files(spec)?;
        }

        Ok(())
    }

    fn secondary_reader(
        &self,
        spec: &RepertoireSpec,
        key: &str,
    ) -> Result<Option<Box<dyn Read + Send>>> {
        let path = self.cache_dir(spec).join(clean_name(key));
        match File::open(path) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn secondary_writer(
        &self,
        spec: &RepertoireSpec,
        key: &str,
    ) -> Result<Option<Box<dyn Write + Send>>> {
        let dir = self.cache_dir(spec);
        fs::create_dir_all(&dir)?;
        Ok(Some(Box::new(File::create(dir.join(clean_name(key)))?)))
    }

    fn delete_secondary_files(&self, spec: &RepertoireSpec) -> Result<()> {
        let dir = self.cache_dir(spec);
        if dir.is_dir() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
