use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use crate::auth::PasswordScheme;

/// Matches the usual browser localStorage allowance.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Durable scope file; `None` keeps everything in memory.
    pub data_file: Option<PathBuf>,
    pub quota_bytes: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    pub password_scheme: PasswordScheme,
    pub seed_demo_users: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "bizpanel=info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store = StoreConfig {
            data_file: std::env::var("BIZPANEL_DATA_FILE").ok().map(PathBuf::from),
            quota_bytes: match std::env::var("BIZPANEL_QUOTA_BYTES") {
                Ok(v) => Some(
                    v.parse::<usize>()
                        .with_context(|| format!("BIZPANEL_QUOTA_BYTES={v:?}"))?,
                ),
                Err(_) => Some(DEFAULT_QUOTA_BYTES),
            },
        };
        let auth = AuthConfig {
            password_scheme: match std::env::var("BIZPANEL_PASSWORD_SCHEME") {
                Ok(v) => v.parse()?,
                Err(_) => PasswordScheme::default(),
            },
            seed_demo_users: std::env::var("BIZPANEL_SEED_DEMO")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };
        let log = LogConfig {
            filter: std::env::var("RUST_LOG").unwrap_or_else(|_| LogConfig::default().filter),
            json: std::env::var("LOG_FORMAT")
                .map(|v| v == "json")
                .unwrap_or(false),
        };
        Ok(Self { store, auth, log })
    }
}
