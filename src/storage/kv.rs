use std::{collections::BTreeMap, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use super::{default_entries, entry_size, MemoryBackend, StorageBackend};
use crate::error::{Result, StoreError};

/// Snapshot of the durable scope: key to raw stored text.
pub type Backup = BTreeMap<String, String>;

/// JSON-valued store over a durable and an ephemeral scope.
///
/// Every public operation swallows backend and serde failures: writes report
/// `false`, reads report `None`. The failure itself is logged.
#[derive(Clone)]
pub struct KeyValueStore {
    durable: Arc<dyn StorageBackend>,
    session: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStore").finish_non_exhaustive()
    }
}

impl KeyValueStore {
    pub fn new(durable: Arc<dyn StorageBackend>, session: Arc<dyn StorageBackend>) -> Self {
        Self { durable, session }
    }

    /// Both scopes in memory, no quota.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()))
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        report_write("set", key, write_json(self.durable.as_ref(), key, value))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        read_json(self.durable.as_ref(), key)
    }

    pub fn remove(&self, key: &str) -> bool {
        report_write("remove", key, self.durable.remove_item(key))
    }

    pub fn clear(&self) -> bool {
        report_write("clear", "*", self.durable.clear())
    }

    /// True when the key holds any text at all, including a stored `null`.
    pub fn exists(&self, key: &str) -> bool {
        matches!(self.durable.get_item(key), Ok(Some(_)))
    }

    pub fn size(&self) -> usize {
        self.durable.len().unwrap_or_else(|e| {
            error!(error = %e, "storage size failed");
            0
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.durable.keys().unwrap_or_else(|e| {
            error!(error = %e, "storage keys failed");
            Vec::new()
        })
    }

    /// The sequence under `key` for a read-modify-write. A missing key (or
    /// stored `null`) is an empty sequence; text that does not parse as one
    /// is `None`, so callers never overwrite data they could not read.
    pub fn get_array<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let raw = match self.durable.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some(Vec::new()),
            Err(e) => {
                error!(key, error = %e, "storage read failed");
                return None;
            }
        };
        if raw.is_empty() || raw == "null" {
            return Some(Vec::new());
        }
        match serde_json::from_str(&raw).map_err(StoreError::Deserialize) {
            Ok(items) => Some(items),
            Err(e) => {
                error!(key, error = %e, "stored sequence unreadable; refusing to rewrite it");
                None
            }
        }
    }

    /// Appends to the sequence under `key`, starting one if the key is
    /// missing. Returns false without writing if the stored value is
    /// unreadable.
    pub fn add_to_array<T>(&self, key: &str, item: T) -> bool
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(mut items) = self.get_array::<T>(key) else {
            return false;
        };
        items.push(item);
        self.set(key, &items)
    }

    /// Drops every element matching `predicate`.
    pub fn remove_from_array<T, P>(&self, key: &str, predicate: P) -> bool
    where
        T: Serialize + DeserializeOwned,
        P: Fn(&T) -> bool,
    {
        let Some(mut items) = self.get_array::<T>(key) else {
            return false;
        };
        items.retain(|item| !predicate(item));
        self.set(key, &items)
    }

    /// Replaces every element matching `predicate` with `update(element)`,
    /// keeping order and length.
    pub fn update_in_array<T, P, F>(&self, key: &str, predicate: P, update: F) -> bool
    where
        T: Serialize + DeserializeOwned,
        P: Fn(&T) -> bool,
        F: Fn(T) -> T,
    {
        let Some(items) = self.get_array::<T>(key) else {
            return false;
        };
        let items: Vec<T> = items
            .into_iter()
            .map(|item| if predicate(&item) { update(item) } else { item })
            .collect();
        self.set(key, &items)
    }

    pub fn set_session<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        report_write("set_session", key, write_json(self.session.as_ref(), key, value))
    }

    pub fn get_session<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        read_json(self.session.as_ref(), key)
    }

    pub fn remove_session(&self, key: &str) -> bool {
        report_write("remove_session", key, self.session.remove_item(key))
    }

    /// Raw text of every durable key, as physically stored.
    pub fn backup(&self) -> Backup {
        match snapshot(self.durable.as_ref()) {
            Ok(backup) => backup,
            Err(e) => {
                error!(error = %e, "backup failed");
                Backup::new()
            }
        }
    }

    /// Clears the durable scope and writes `backup` verbatim. Full replace.
    pub fn restore(&self, backup: &Backup) -> bool {
        let result = self.durable.clear().and_then(|_| {
            backup
                .iter()
                .try_for_each(|(key, raw)| self.durable.set_item(key, raw))
        });
        match result {
            Ok(()) => {
                info!(keys = backup.len(), "storage restored from backup");
                true
            }
            Err(e) => {
                error!(error = %e, "restore failed");
                false
            }
        }
    }

    /// Pretty JSON document of [`backup`](Self::backup), for export files.
    pub fn export_json(&self) -> Option<String> {
        serde_json::to_string_pretty(&self.backup())
            .map_err(|e| error!(error = %e, "export failed"))
            .ok()
    }

    /// Parses an exported document and restores it. Unparseable input
    /// leaves the store untouched.
    pub fn import_json(&self, text: &str) -> bool {
        match serde_json::from_str::<Backup>(text) {
            Ok(backup) => self.restore(&backup),
            Err(e) => {
                warn!(error = %e, "import rejected: not a backup document");
                false
            }
        }
    }

    /// Writes each well-known default only where the key is absent.
    /// Returns false if any of those writes failed.
    pub fn initialize_defaults(&self) -> bool {
        let mut ok = true;
        let mut written = 0usize;
        for (key, value) in default_entries() {
            if self.exists(key) {
                continue;
            }
            if self.set(key, &value) {
                written += 1;
            } else {
                ok = false;
            }
        }
        debug!(written, "storage defaults initialized");
        ok
    }

    /// Total footprint of the durable scope (key plus raw value lengths).
    pub fn storage_size(&self) -> usize {
        self.backup().iter().map(|(k, v)| entry_size(k, v)).sum()
    }
}

fn write_json<T: Serialize + ?Sized>(
    backend: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> Result<()> {
    let text = serde_json::to_string(value).map_err(StoreError::Serialize)?;
    backend.set_item(key, &text)
}

fn read_json<T: DeserializeOwned>(backend: &dyn StorageBackend, key: &str) -> Option<T> {
    let raw = match backend.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            error!(key, error = %e, "storage read failed");
            return None;
        }
    };
    if raw.is_empty() || raw == "null" {
        return None;
    }
    match serde_json::from_str(&raw).map_err(StoreError::Deserialize) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "stored value unreadable; treating as missing");
            None
        }
    }
}

fn snapshot(backend: &dyn StorageBackend) -> Result<Backup> {
    let mut backup = Backup::new();
    for key in backend.keys()? {
        if let Some(raw) = backend.get_item(&key)? {
            backup.insert(key, raw);
        }
    }
    Ok(backup)
}

fn report_write(op: &'static str, key: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!(op, key, error = %e, "storage write failed");
            false
        }
    }
}

pub fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok()
}

/// Human-readable size in base-1024 units, two decimals at most.
pub fn format_storage_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let bytes = bytes as f64;
    let exp = ((bytes.ln() / 1024f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let scaled = (bytes / 1024f64.powi(exp as i32) * 100.0).round() / 100.0;
    format!("{} {}", scaled, UNITS[exp])
}
