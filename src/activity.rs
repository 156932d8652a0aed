use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock;
use crate::storage::KeyValueStore;

pub const ACTIVITIES_KEY: &str = "recentActivities";
pub const ACTIVITY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntry {
    pub id: i64, // creation time, unix millis
    pub icon: String,
    pub text: String,
    pub time: String,
}

/// Newest-first feed capped at [`ACTIVITY_LIMIT`] entries.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    store: KeyValueStore,
}

impl ActivityFeed {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    /// Prepends an entry, dropping the oldest beyond the cap. `time`
    /// defaults to now.
    pub fn add(&self, icon: &str, text: &str, time: Option<String>) -> bool {
        let mut entries = self.all();
        entries.insert(
            0,
            ActivityEntry {
                id: clock::now_millis(),
                icon: icon.to_string(),
                text: text.to_string(),
                time: time.unwrap_or_else(clock::now_stamp),
            },
        );
        entries.truncate(ACTIVITY_LIMIT);
        debug!(count = entries.len(), "activity recorded");
        self.store.set(ACTIVITIES_KEY, &entries)
    }

    pub fn all(&self) -> Vec<ActivityEntry> {
        self.store.get(ACTIVITIES_KEY).unwrap_or_default()
    }

    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let mut entries = self.all();
        entries.truncate(limit);
        entries
    }
}
