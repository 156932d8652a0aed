use std::str::FromStr;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64ct::{Base64, Encoding};
use rand::rngs::OsRng;
use serde::Deserialize;
use tracing::error;

/// Suffix appended by the legacy scheme before encoding.
const LEGACY_SALT: &str = "business_panel_salt";

/// How new password hashes are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Salted argon2 PHC string.
    #[default]
    Argon2,
    /// Demo/migration only: base64 of the password plus a fixed suffix.
    /// Not a one-way function.
    Legacy,
}

impl FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "argon2" => Ok(Self::Argon2),
            "legacy" => Ok(Self::Legacy),
            other => anyhow::bail!("unknown password scheme {other:?}"),
        }
    }
}

impl PasswordScheme {
    pub fn hash(self, plain: &str) -> anyhow::Result<String> {
        match self {
            Self::Argon2 => hash_password(plain),
            Self::Legacy => Ok(legacy_hash(plain)),
        }
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn legacy_hash(plain: &str) -> String {
    Base64::encode_string(format!("{plain}{LEGACY_SALT}").as_bytes())
}

/// Checks `plain` against a stored hash of either scheme. PHC strings go
/// through argon2; anything else is compared as a legacy hash.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    if !hash.starts_with("$argon2") {
        return Ok(legacy_hash(plain) == hash);
    }
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
