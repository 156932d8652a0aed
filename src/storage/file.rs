use std::{
    fs,
    path::{Path, PathBuf},
};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{memory::upsert, StorageBackend};
use crate::error::{Result, StoreError};

/// Durable backend persisted as a JSON array of `[key, raw]` pairs.
///
/// The whole file is rewritten on each mutation through a sibling temp
/// file, and the in-memory copy only changes once that write succeeded.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<Vec<(String, String)>>,
    quota: Option<usize>,
}

impl FileBackend {
    pub fn open(path: impl Into<PathBuf>, quota: Option<usize>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&text).map_err(StoreError::Deserialize)?
            }
        } else {
            Vec::new()
        };
        info!(path = %path.display(), keys = entries.len(), "opened file storage");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            quota,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<(String, String)>) -> Result<()>,
    {
        let mut guard = self.entries.write();
        let mut next = guard.clone();
        f(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, entries: &[(String, String)]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string(entries).map_err(StoreError::Serialize)?;
        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "file storage flushed");
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let quota = self.quota;
        self.mutate(|entries| upsert(entries, key, value, quota))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.retain(|(k, _)| k != key);
            Ok(())
        })
    }

    fn clear(&self) -> Result<()> {
        self.mutate(|entries| {
            entries.clear();
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().iter().map(|(k, _)| k.clone()).collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}
