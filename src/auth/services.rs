use rand::Rng;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    password::{verify_password, PasswordScheme},
    repo_types::{ExternalProfile, LoginMethod, NewUser, SessionUser, User, UserPatch, UserStats},
};
use crate::clock;
use crate::storage::KeyValueStore;

/// Durable key of the single session slot.
pub const CURRENT_USER_KEY: &str = "currentUser";
pub const REMEMBER_ME_KEY: &str = "rememberMe";

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "123456";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `user_<unix-millis>_<9 base36 chars>`.
pub fn generate_user_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("user_{}_{}", clock::now_millis(), suffix)
}

/// Registration, login and the single current-session slot.
///
/// Every flow reports a plain `bool`. A `false` from `login` never says
/// whether the email, the password or the account state was at fault.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: KeyValueStore,
    scheme: PasswordScheme,
}

impl SessionManager {
    pub fn new(store: KeyValueStore, scheme: PasswordScheme) -> Self {
        Self { store, scheme }
    }

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.store.get(CURRENT_USER_KEY)
    }

    /// Logged in, and the registry still holds that user as active.
    pub fn is_session_valid(&self) -> bool {
        let Some(session) = self.current_user() else {
            return false;
        };
        match User::find_by_id(&self.store, &session.id) {
            Some(user) if user.is_active => true,
            Some(_) => {
                warn!(user_id = %session.id, "session belongs to a deactivated account");
                false
            }
            None => {
                warn!(user_id = %session.id, "session user missing from registry");
                false
            }
        }
    }

    #[instrument(skip(self, data), fields(email = %data.email))]
    pub fn register(&self, data: &NewUser) -> bool {
        if User::email_taken(&self.store, &data.email) {
            warn!("email already registered");
            return false;
        }

        let hash = match self.scheme.hash(&data.password) {
            Ok(h) => h,
            Err(e) => {
                error!(error = %e, "hash_password failed");
                return false;
            }
        };

        let user = User {
            id: generate_user_id(),
            name: data.name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone().unwrap_or_default(),
            password: Some(hash),
            created_at: clock::today(),
            is_active: true,
            login_method: LoginMethod::Local,
            profile_image: data.profile_image.clone(),
            last_login: None,
        };

        if !User::insert(&self.store, &user) {
            error!("create user failed");
            return false;
        }
        info!(user_id = %user.id, "user registered");
        self.start_session(&user)
    }

    /// Creates a password-less account, or signs in the existing one with
    /// that email.
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub fn register_with_external_provider(&self, profile: &ExternalProfile) -> bool {
        if User::email_taken(&self.store, &profile.email) {
            return self.login_with_external_provider(profile);
        }

        let user = User {
            id: generate_user_id(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone().unwrap_or_default(),
            password: None,
            created_at: clock::today(),
            is_active: true,
            login_method: LoginMethod::External,
            profile_image: profile.profile_image.clone(),
            last_login: None,
        };

        if !User::insert(&self.store, &user) {
            error!("create external user failed");
            return false;
        }
        info!(user_id = %user.id, "external user registered");
        self.start_session(&user)
    }

    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> bool {
        let user = User::all(&self.store).into_iter().find(|u| {
            u.email == email && u.is_active && password_matches(password, u.password.as_deref())
        });

        match user {
            Some(user) => self.start_session(&user),
            None => {
                warn!("login rejected");
                false
            }
        }
    }

    /// Signs in an active account by email alone, refreshing its name and
    /// image from the provider. Never creates an account.
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub fn login_with_external_provider(&self, profile: &ExternalProfile) -> bool {
        let Some(found) = User::all(&self.store)
            .into_iter()
            .find(|u| u.email == profile.email && u.is_active)
        else {
            warn!("external login rejected");
            return false;
        };

        let refreshed = User::update_by_id(&self.store, &found.id, |u| {
            u.name = profile.name.clone();
            if profile.profile_image.is_some() {
                u.profile_image = profile.profile_image.clone();
            }
        });
        match refreshed {
            Some(user) => self.start_session(&user),
            None => {
                error!(user_id = %found.id, "persisting provider profile failed");
                false
            }
        }
    }

    fn start_session(&self, user: &User) -> bool {
        let stamp = clock::now_stamp();
        let user = match User::update_by_id(&self.store, &user.id, |u| {
            u.last_login = Some(stamp.clone())
        }) {
            Some(updated) => updated,
            None => {
                warn!(user_id = %user.id, "could not record last login");
                user.clone()
            }
        };

        if !self.store.set(CURRENT_USER_KEY, &SessionUser::from(&user)) {
            error!(user_id = %user.id, "writing session failed");
            return false;
        }
        info!(user_id = %user.id, "user logged in");
        true
    }

    /// Empties the session slot and the remember-me flag. Always succeeds
    /// when there was nothing to clear.
    pub fn logout(&self) -> bool {
        let cleared = self.store.remove(CURRENT_USER_KEY);
        let forgot = self.store.remove(REMEMBER_ME_KEY);
        if cleared && forgot {
            info!("user logged out");
        }
        cleared && forgot
    }

    /// Applies `patch` to the registry record with `id` and refreshes the
    /// session copy from the merged record.
    #[instrument(skip(self, patch))]
    pub fn update_user(&self, id: &str, patch: &UserPatch) -> bool {
        let Some(user) = User::update_by_id(&self.store, id, |u| u.apply(patch)) else {
            warn!("update for unknown user");
            return false;
        };
        if !self.store.set(CURRENT_USER_KEY, &SessionUser::from(&user)) {
            error!(user_id = %user.id, "refreshing session failed");
            return false;
        }
        info!(user_id = %user.id, "user updated");
        true
    }

    #[instrument(skip(self, current, new))]
    pub fn change_password(&self, current: &str, new: &str) -> bool {
        let Some(session) = self.current_user() else {
            warn!("change_password without session");
            return false;
        };
        let Some(user) = User::find_by_id(&self.store, &session.id) else {
            warn!(user_id = %session.id, "session user missing from registry");
            return false;
        };
        if !password_matches(current, user.password.as_deref()) {
            warn!(user_id = %user.id, "current password mismatch");
            return false;
        }
        if !self.replace_hash(&user.id, new) {
            return false;
        }
        info!(user_id = %user.id, "password changed");
        true
    }

    /// Out-of-band reset: overwrites the hash without checking the old one.
    #[instrument(skip(self, new))]
    pub fn reset_password(&self, email: &str, new: &str) -> bool {
        let Some(user) = User::find_by_email(&self.store, email) else {
            warn!("reset for unknown email");
            return false;
        };
        if !self.replace_hash(&user.id, new) {
            return false;
        }
        info!(user_id = %user.id, "password reset");
        true
    }

    fn replace_hash(&self, id: &str, new: &str) -> bool {
        let hash = match self.scheme.hash(new) {
            Ok(h) => h,
            Err(e) => {
                error!(error = %e, "hash_password failed");
                return false;
            }
        };
        User::update_by_id(&self.store, id, |u| u.password = Some(hash)).is_some()
    }

    /// Soft-deletes the signed-in account and logs out.
    pub fn deactivate_account(&self) -> bool {
        let Some(session) = self.current_user() else {
            warn!("deactivate without session");
            return false;
        };
        if User::update_by_id(&self.store, &session.id, |u| u.is_active = false).is_none() {
            error!(user_id = %session.id, "deactivation not persisted");
            return false;
        }
        info!(user_id = %session.id, "account deactivated");
        self.logout()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        User::find_by_email(&self.store, email)
    }

    pub fn user_by_id(&self, id: &str) -> Option<User> {
        User::find_by_id(&self.store, id)
    }

    pub fn user_stats(&self) -> UserStats {
        User::stats(&self.store)
    }

    pub fn set_remember_me(&self, value: bool) -> bool {
        self.store.set(REMEMBER_ME_KEY, &value)
    }

    pub fn remember_me(&self) -> bool {
        self.store.get(REMEMBER_ME_KEY).unwrap_or(false)
    }

    /// Adds the demo account when the registry is empty. Returns whether an
    /// account was added.
    pub fn seed_demo_users(&self) -> bool {
        if !User::all(&self.store).is_empty() {
            return false;
        }
        let hash = match self.scheme.hash(DEMO_PASSWORD) {
            Ok(h) => h,
            Err(e) => {
                error!(error = %e, "hash_password failed");
                return false;
            }
        };
        let demo = User {
            id: generate_user_id(),
            name: "Demo User".into(),
            email: DEMO_EMAIL.into(),
            phone: "09123456789".into(),
            password: Some(hash),
            created_at: clock::today(),
            is_active: true,
            login_method: LoginMethod::Local,
            profile_image: None,
            last_login: None,
        };
        let ok = User::insert(&self.store, &demo);
        if ok {
            info!(user_id = %demo.id, "demo user seeded");
        }
        ok
    }
}

/// Accounts without a stored hash never match a password.
fn password_matches(plain: &str, hash: Option<&str>) -> bool {
    let Some(hash) = hash else {
        return false;
    };
    verify_password(plain, hash).unwrap_or_else(|e| {
        error!(error = %e, "verify_password failed");
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(KeyValueStore::in_memory(), PasswordScheme::Argon2)
    }

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            name: "Test".into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    fn provider(email: &str, name: &str, image: Option<&str>) -> ExternalProfile {
        ExternalProfile {
            name: name.into(),
            email: email.into(),
            phone: None,
            profile_image: image.map(Into::into),
        }
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = generate_user_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(generate_user_id(), generate_user_id());
    }

    #[test]
    fn register_logs_in_and_hashes() {
        let auth = manager();
        assert!(!auth.is_logged_in());
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        assert!(auth.is_logged_in());

        let stored = auth.user_by_email("a@x.com").unwrap();
        assert!(stored.is_active);
        assert_eq!(stored.login_method, LoginMethod::Local);
        assert_ne!(stored.password.as_deref(), Some("secret1"));
        assert!(stored.last_login.is_some());
        assert_eq!(auth.current_user().unwrap().id, stored.id);
    }

    #[test]
    fn duplicate_email_is_rejected_without_touching_registry() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        let before = auth.store().get::<serde_json::Value>("users");

        assert!(!auth.register(&new_user("a@x.com", "other-pass")));
        assert_eq!(auth.store().get::<serde_json::Value>("users"), before);

        // Case-sensitive: a different casing is a different email.
        assert!(auth.register(&new_user("A@x.com", "secret1")));
        assert_eq!(auth.user_stats().total_users, 2);
    }

    #[test]
    fn session_never_contains_password() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        assert!(auth.login("a@x.com", "secret1"));
        let raw = auth.store().get::<serde_json::Value>(CURRENT_USER_KEY).unwrap();
        assert!(raw.get("password").is_none());
        assert_eq!(raw["email"], "a@x.com");
    }

    #[test]
    fn failed_login_keeps_existing_session() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        let session = auth.current_user();

        assert!(!auth.login("nobody@x.com", "secret1"));
        assert!(!auth.login("a@x.com", "wrong"));
        assert_eq!(auth.current_user(), session);
    }

    #[test]
    fn logout_is_idempotent_and_clears_remember_me() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        assert!(auth.set_remember_me(true));
        assert!(auth.remember_me());

        assert!(auth.logout());
        assert!(!auth.is_logged_in());
        assert!(!auth.remember_me());
        assert!(auth.logout());
    }

    #[test]
    fn deactivated_account_cannot_log_in() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        assert!(auth.deactivate_account());
        assert!(!auth.is_logged_in());
        assert!(!auth.user_by_email("a@x.com").unwrap().is_active);
        assert!(!auth.login("a@x.com", "secret1"));
        assert!(!auth.deactivate_account());
    }

    /// Durable scope whose removals always fail.
    struct NoRemoveBackend(crate::storage::MemoryBackend);

    impl crate::storage::StorageBackend for NoRemoveBackend {
        fn get_item(&self, key: &str) -> crate::error::Result<Option<String>> {
            self.0.get_item(key)
        }
        fn set_item(&self, key: &str, value: &str) -> crate::error::Result<()> {
            self.0.set_item(key, value)
        }
        fn remove_item(&self, _key: &str) -> crate::error::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
        fn clear(&self) -> crate::error::Result<()> {
            self.0.clear()
        }
        fn keys(&self) -> crate::error::Result<Vec<String>> {
            self.0.keys()
        }
    }

    #[test]
    fn deactivate_reports_failed_logout() {
        use std::sync::Arc;

        let store = KeyValueStore::new(
            Arc::new(NoRemoveBackend(crate::storage::MemoryBackend::new())),
            Arc::new(crate::storage::MemoryBackend::new()),
        );
        let auth = SessionManager::new(store, PasswordScheme::Argon2);
        assert!(auth.register(&new_user("a@x.com", "secret1")));

        assert!(!auth.deactivate_account());
        assert!(!auth.user_by_email("a@x.com").unwrap().is_active);
        assert!(auth.is_logged_in());
    }

    #[test]
    fn stale_session_is_not_valid_after_deactivation_elsewhere() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        assert!(auth.is_session_valid());

        let id = auth.current_user().unwrap().id;
        User::update_by_id(auth.store(), &id, |u| u.is_active = false);
        assert!(auth.is_logged_in());
        assert!(!auth.is_session_valid());
    }

    #[test]
    fn restored_sparse_registry_keeps_accounts_and_uniqueness() {
        use crate::auth::password::legacy_hash;
        use crate::storage::Backup;

        let auth = manager();
        let users = serde_json::json!([
            {"id": "u1", "email": "a@x.com", "password": legacy_hash("secret1"),
             "isActive": true, "loginMethod": "email"},
            {"id": "u2", "name": "B", "email": "b@x.com", "password": legacy_hash("secret1"),
             "createdAt": "1403/01/01", "isActive": true, "loginMethod": "email"}
        ]);
        let mut backup = Backup::new();
        backup.insert("users".into(), users.to_string());
        assert!(auth.store().restore(&backup));

        assert_eq!(auth.user_stats().total_users, 2);
        assert!(auth.login("b@x.com", "secret1"));
        assert!(!auth.register(&new_user("a@x.com", "other-pass")));
        assert!(!auth.seed_demo_users());

        let ids: Vec<String> = User::all(auth.store()).into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
    }

    #[test]
    fn unreadable_registry_is_never_overwritten() {
        use crate::storage::Backup;

        let auth = manager();
        let mut backup = Backup::new();
        backup.insert("users".into(), r#"{"not": "a list"}"#.into());
        assert!(auth.store().restore(&backup));

        assert!(!auth.register(&new_user("a@x.com", "secret1")));
        assert!(!auth.register_with_external_provider(&provider("g@x.com", "G", None)));
        assert!(!auth.seed_demo_users());
        assert!(!auth.is_logged_in());
        assert_eq!(auth.store().backup(), backup);
    }

    #[test]
    fn minimal_session_record_counts_as_logged_in() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        let id = auth.current_user().unwrap().id;
        assert!(auth
            .store()
            .set(CURRENT_USER_KEY, &serde_json::json!({"id": id, "email": "a@x.com"})));

        assert!(auth.is_logged_in());
        assert_eq!(auth.current_user().unwrap().email, "a@x.com");
        assert!(auth.change_password("secret1", "secret2"));
        assert!(auth.deactivate_account());
        assert!(!auth.is_logged_in());
    }

    #[test]
    fn external_registration_and_login() {
        let auth = manager();
        assert!(auth.register_with_external_provider(&provider("g@x.com", "G", Some("img1"))));
        let user = auth.user_by_email("g@x.com").unwrap();
        assert_eq!(user.login_method, LoginMethod::External);
        assert!(user.password.is_none());
        assert!(!auth.login("g@x.com", ""));

        auth.logout();
        // Existing email: signs in and refreshes profile instead of duplicating.
        assert!(auth.register_with_external_provider(&provider("g@x.com", "G2", None)));
        assert_eq!(auth.user_stats().total_users, 1);
        let user = auth.user_by_email("g@x.com").unwrap();
        assert_eq!(user.name, "G2");
        assert_eq!(user.profile_image.as_deref(), Some("img1"));
        assert_eq!(auth.current_user().unwrap().name, "G2");
    }

    #[test]
    fn external_login_never_auto_registers() {
        let auth = manager();
        assert!(!auth.login_with_external_provider(&provider("new@x.com", "N", None)));
        assert_eq!(auth.user_stats().total_users, 0);
        assert!(!auth.is_logged_in());
    }

    #[test]
    fn update_user_merges_and_refreshes_session() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        let id = auth.current_user().unwrap().id;
        let hash_before = auth.user_by_id(&id).unwrap().password;

        assert!(auth.update_user(
            &id,
            &UserPatch {
                name: Some("Renamed".into()),
                phone: Some("09120000000".into()),
                ..Default::default()
            }
        ));
        let stored = auth.user_by_id(&id).unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.email, "a@x.com");
        assert_eq!(stored.password, hash_before);
        assert_eq!(auth.current_user().unwrap().phone, "09120000000");

        assert!(!auth.update_user("user_0_missing", &UserPatch::default()));
    }

    #[test]
    fn change_password_requires_session_and_current_password() {
        let auth = manager();
        assert!(!auth.change_password("a", "b"));
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        assert!(!auth.change_password("wrong", "secret2"));
        assert!(auth.change_password("secret1", "secret2"));
        assert!(auth.is_logged_in());
    }

    #[test]
    fn reset_password_is_unconditional_for_known_email() {
        let auth = manager();
        assert!(!auth.reset_password("a@x.com", "whatever"));
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        auth.logout();
        assert!(auth.reset_password("a@x.com", "fresh-one"));
        assert!(!auth.login("a@x.com", "secret1"));
        assert!(auth.login("a@x.com", "fresh-one"));
    }

    #[test]
    fn full_account_scenario() {
        let auth = manager();
        assert!(auth.register(&new_user("a@x.com", "secret1")));
        assert!(auth.login("a@x.com", "secret1"));
        assert_eq!(auth.current_user().unwrap().email, "a@x.com");
        assert!(!auth.login("a@x.com", "wrong"));
        assert!(auth.change_password("secret1", "secret2"));
        assert!(auth.logout());
        assert!(!auth.login("a@x.com", "secret1"));
        assert!(auth.login("a@x.com", "secret2"));
    }

    #[test]
    fn legacy_scheme_stores_base64_and_verifies() {
        let auth = SessionManager::new(KeyValueStore::in_memory(), PasswordScheme::Legacy);
        assert!(auth.seed_demo_users());
        assert!(!auth.seed_demo_users());
        let demo = auth.user_by_email(DEMO_EMAIL).unwrap();
        assert_eq!(
            demo.password.as_deref(),
            Some("MTIzNDU2YnVzaW5lc3NfcGFuZWxfc2FsdA==")
        );
        assert!(auth.login(DEMO_EMAIL, DEMO_PASSWORD));
    }

    #[test]
    fn legacy_hashes_still_verify_after_switching_to_argon2() {
        let store = KeyValueStore::in_memory();
        let legacy = SessionManager::new(store.clone(), PasswordScheme::Legacy);
        assert!(legacy.register(&new_user("old@x.com", "secret1")));
        legacy.logout();

        let modern = SessionManager::new(store, PasswordScheme::Argon2);
        assert!(modern.login("old@x.com", "secret1"));
        assert!(modern.change_password("secret1", "secret2"));
        let stored = modern.user_by_email("old@x.com").unwrap();
        assert!(stored.password.unwrap().starts_with("$argon2"));
    }

    #[test]
    fn stats_by_login_method() {
        let auth = manager();
        auth.register(&new_user("a@x.com", "secret1"));
        auth.register_with_external_provider(&provider("g@x.com", "G", None));
        auth.deactivate_account();
        let stats = auth.user_stats();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_users, 1);
        assert_eq!(stats.local_users, 1);
        assert_eq!(stats.external_users, 1);
    }
}
