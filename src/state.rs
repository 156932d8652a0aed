use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::activity::ActivityFeed;
use crate::auth::SessionManager;
use crate::config::AppConfig;
use crate::preferences::Preferences;
use crate::storage::{FileBackend, KeyValueStore, MemoryBackend, StorageBackend};

/// Everything the panel's UI handlers call into, sharing one store.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: KeyValueStore,
    pub auth: SessionManager,
    pub activity: ActivityFeed,
    pub preferences: Preferences,
}

impl AppState {
    /// Opens the durable scope, seeds well-known defaults and, if asked,
    /// the demo account.
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let quota = config.store.quota_bytes;
        let durable: Arc<dyn StorageBackend> = match &config.store.data_file {
            Some(path) => Arc::new(
                FileBackend::open(path, quota)
                    .with_context(|| format!("open data file {}", path.display()))?,
            ),
            None => Arc::new(match quota {
                Some(bytes) => MemoryBackend::with_quota(bytes),
                None => MemoryBackend::new(),
            }),
        };
        let session: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let store = KeyValueStore::new(durable, session);

        if !store.initialize_defaults() {
            anyhow::bail!("could not write storage defaults");
        }

        let state = Self::from_parts(Arc::new(config), store);
        if state.config.auth.seed_demo_users {
            state.auth.seed_demo_users();
        }
        info!(keys = state.store.size(), "panel state ready");
        Ok(state)
    }

    pub fn from_parts(config: Arc<AppConfig>, store: KeyValueStore) -> Self {
        let auth = SessionManager::new(store.clone(), config.auth.password_scheme);
        Self {
            activity: ActivityFeed::new(store.clone()),
            preferences: Preferences::new(store.clone()),
            auth,
            store,
            config,
        }
    }

    /// In-memory state with default config, for tests.
    pub fn fake() -> Self {
        Self::from_parts(Arc::new(AppConfig::default()), KeyValueStore::in_memory())
    }
}
