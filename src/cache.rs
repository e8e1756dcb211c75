//! In-process user lookup caches.
//!
//! Two independent maps, keyed by login and by email. Entries never expire
//! on their own: every mutating operation evicts the keys it touched, for
//! both the pre-image and the post-image of the account.

use dashmap::DashMap;

use crate::user::User;

/// Lookup caches for persisted users.
#[derive(Debug, Default)]
pub struct UserCache {
    by_login: DashMap<String, User>,
    by_email: DashMap<String, User>,
}

impl UserCache {
    /// Create a new [`UserCache`].
    pub fn new() -> Self {
        Self {
            by_login: DashMap::new(),
            by_email: DashMap::new(),
        }
    }

    /// Look up a user by login.
    pub fn get_by_login(&self, login: &str) -> Option<User> {
        self.by_login
            .get(&login.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    /// Look up a user by email.
    pub fn get_by_email(&self, email: &str) -> Option<User> {
        self.by_email
            .get(&email.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    /// Remember a user under both lookup keys.
    pub fn store(&self, user: &User) {
        self.by_login
            .insert(user.login.to_lowercase(), user.clone());
        if let Some(email) = &user.email {
            self.by_email.insert(email.to_lowercase(), user.clone());
        }
    }

    /// Drop the entries indexed by this image of the user.
    ///
    /// Callers evict the image they read before mutating and the image they
    /// wrote afterwards, so renamed logins and changed emails leave no stale
    /// entry behind.
    pub fn evict(&self, user: &User) {
        self.by_login.remove(&user.login.to_lowercase());
        if let Some(email) = &user.email {
            self.by_email.remove(&email.to_lowercase());
        }
    }
}
