use parking_lot::RwLock;

use super::{entry_size, StorageBackend};
use crate::error::{Result, StoreError};

/// In-process backend; the ephemeral scope and the default durable scope.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<Vec<(String, String)>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects writes that would push the total footprint past `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            quota: Some(bytes),
        }
    }
}

/// Size the entry list would have after writing `key = value`.
pub(crate) fn projected_size(entries: &[(String, String)], key: &str, value: &str) -> usize {
    entries
        .iter()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| entry_size(k, v))
        .sum::<usize>()
        + entry_size(key, value)
}

/// Upserts into an ordered entry list, enforcing `quota` first.
pub(crate) fn upsert(
    entries: &mut Vec<(String, String)>,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> Result<()> {
    if let Some(limit) = quota {
        if projected_size(entries, key, value) > limit {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                limit,
            });
        }
    }
    match entries.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value.to_string(),
        None => entries.push((key.to_string(), value.to_string())),
    }
    Ok(())
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        upsert(&mut self.entries.write(), key, value, self.quota)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.write().retain(|(k, _)| k != key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().iter().map(|(k, _)| k.clone()).collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_insertion_position() {
        let backend = MemoryBackend::new();
        backend.set_item("a", "1").unwrap();
        backend.set_item("b", "2").unwrap();
        backend.set_item("a", "3").unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["a", "b"]);
        assert_eq!(backend.get_item("a").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn quota_rejects_oversized_write_and_keeps_old_value() {
        let backend = MemoryBackend::with_quota(10);
        backend.set_item("k", "12345").unwrap();
        let err = backend.set_item("k", "0123456789").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { limit: 10, .. }));
        assert_eq!(backend.get_item("k").unwrap().as_deref(), Some("12345"));
    }

    #[test]
    fn overwrite_is_measured_without_the_old_value() {
        let backend = MemoryBackend::with_quota(6);
        backend.set_item("k", "12345").unwrap();
        backend.set_item("k", "54321").unwrap();
        assert_eq!(backend.len().unwrap(), 1);
    }
}
