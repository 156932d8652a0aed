use crate::auth::repo_types::{LoginMethod, User, UserStats};
use crate::storage::KeyValueStore;

/// Key holding the whole registry as one array.
pub const USERS_KEY: &str = "users";

impl User {
    /// The full registry in insertion order; empty if missing or unreadable.
    pub fn all(store: &KeyValueStore) -> Vec<User> {
        store.get(USERS_KEY).unwrap_or_default()
    }

    /// First record with exactly this email (case-sensitive).
    pub fn find_by_email(store: &KeyValueStore, email: &str) -> Option<User> {
        Self::all(store).into_iter().find(|u| u.email == email)
    }

    pub fn find_by_id(store: &KeyValueStore, id: &str) -> Option<User> {
        Self::all(store).into_iter().find(|u| u.id == id)
    }

    pub fn email_taken(store: &KeyValueStore, email: &str) -> bool {
        Self::all(store).iter().any(|u| u.email == email)
    }

    /// Appends without any uniqueness check; callers pre-check the email.
    /// Refuses to write over a registry that exists but cannot be read.
    pub fn insert(store: &KeyValueStore, user: &User) -> bool {
        store.add_to_array(USERS_KEY, user.clone())
    }

    /// Mutates the first record with `id` and persists the registry.
    /// Returns the updated record, or `None` if there is no such id, the
    /// registry is unreadable, or the write failed.
    pub fn update_by_id<F>(store: &KeyValueStore, id: &str, f: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = store.get_array::<User>(USERS_KEY)?;
        let user = users.iter_mut().find(|u| u.id == id)?;
        f(&mut *user);
        let updated = user.clone();
        store.set(USERS_KEY, &users).then_some(updated)
    }

    pub fn stats(store: &KeyValueStore) -> UserStats {
        let users = Self::all(store);
        UserStats {
            total_users: users.len(),
            active_users: users.iter().filter(|u| u.is_active).count(),
            external_users: users
                .iter()
                .filter(|u| u.login_method == LoginMethod::External)
                .count(),
            local_users: users
                .iter()
                .filter(|u| u.login_method == LoginMethod::Local)
                .count(),
        }
    }
}
