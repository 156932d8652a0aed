//! Local data store and account/session layer for a small business panel.
//!
//! [`storage::KeyValueStore`] keeps JSON values in a durable and an
//! ephemeral string store. [`auth::SessionManager`] builds the user
//! registry and the single current-session slot on top of it.

pub mod activity;
pub mod auth;
mod clock;
pub mod config;
pub mod error;
pub mod preferences;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use state::AppState;
