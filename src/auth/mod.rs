pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

pub use password::PasswordScheme;
pub use repo_types::{ExternalProfile, LoginMethod, NewUser, SessionUser, User, UserPatch, UserStats};
pub use services::SessionManager;
