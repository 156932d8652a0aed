use thiserror::Error;

/// Failures raised below the public store API.
///
/// `KeyValueStore` never hands these to its callers: they are logged and
/// folded into `false` / `None` at that boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("serialize value: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("deserialize value: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("quota exceeded writing {key:?} (limit {limit} bytes)")]
    QuotaExceeded { key: String, limit: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
