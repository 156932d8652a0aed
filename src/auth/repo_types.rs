use serde::{Deserialize, Deserializer, Serialize};

/// How an account authenticates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoginMethod {
    /// Email and password held in the registry.
    #[serde(rename = "email", alias = "local")]
    Local,
    /// Identity vouched for by an outside provider; no password stored.
    #[serde(rename = "google", alias = "external")]
    External,
}

/// Records written without a method, or with one we do not know, are
/// treated as local accounts.
fn lenient_login_method<'de, D>(deserializer: D) -> Result<LoginMethod, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("google" | "external") => LoginMethod::External,
        _ => LoginMethod::Local,
    })
}

fn default_active() -> bool {
    true
}

fn default_login_method() -> LoginMethod {
    LoginMethod::Local
}

/// Registry record, persisted as one element of the `users` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: Option<String>, // password hash, never plaintext
    #[serde(default)]
    pub created_at: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_login_method", deserialize_with = "lenient_login_method")]
    pub login_method: LoginMethod,
    #[serde(rename = "profile_image", alias = "profileImage", default)]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl User {
    /// Applies each provided field; absent ones are kept.
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = phone.clone();
        }
        if let Some(image) = &patch.profile_image {
            self.profile_image = image.clone();
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
    }
}

/// The user currently signed in to this context. Has no password field at
/// all, so a hash can never leak into the session slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_login_method", deserialize_with = "lenient_login_method")]
    pub login_method: LoginMethod,
    #[serde(rename = "profile_image", alias = "profileImage", default)]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl From<&User> for SessionUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            created_at: u.created_at.clone(),
            is_active: u.is_active,
            login_method: u.login_method,
            profile_image: u.profile_image.clone(),
            last_login: u.last_login.clone(),
        }
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub profile_image: Option<String>,
}

/// Identity handed over by an external sign-in provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalProfile {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
}

/// Partial update for a registry record. Deliberately has no password.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// `Some(None)` clears the image.
    pub profile_image: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Registry-wide counts.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: usize,
    pub active_users: usize,
    pub external_users: usize,
    pub local_users: usize,
}
