mod defaults;
mod file;
mod kv;
mod memory;

pub use defaults::default_entries;
pub use file::FileBackend;
pub use kv::{format_storage_size, is_valid_json, Backup, KeyValueStore};
pub use memory::MemoryBackend;

use crate::error::Result;

/// Browser-style string storage capability.
///
/// One implementation backs each scope of a [`KeyValueStore`]. Keys are
/// enumerated in insertion order; overwriting a key keeps its position.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;

    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Byte footprint the way browsers account localStorage quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
