//! Account lifecycle orchestration.
//!
//! Every public operation runs inside a single transaction and evicts the
//! lookup-cache entries it touched once that transaction has committed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::cache::UserCache;
use crate::crypto::{self, PasswordManager};
use crate::error::{Result, ServerError};
use crate::user::{ProfileInput, ROLE_USER, RoleRepository, User, UserInput, UserRepository};

/// Reset keys are consumable for 24 hours after issuance.
const RESET_WINDOW_HOURS: i64 = 24;
/// Unactivated accounts are reclaimable by the purge after 3 days.
const STALE_RETENTION_DAYS: i64 = 3;

/// User manager.
#[derive(Clone)]
pub struct UserService {
    pub repo: UserRepository,
    pub roles: RoleRepository,
    cache: Arc<UserCache>,
    pwd: Arc<PasswordManager>,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(pool: PgPool, cache: Arc<UserCache>, pwd: Arc<PasswordManager>) -> Self {
        Self {
            repo: UserRepository::new(pool.clone()),
            roles: RoleRepository::new(pool),
            cache,
            pwd,
        }
    }

    fn hash(&self, plain: &str) -> Result<String> {
        Ok(self.pwd.hash_password(plain)?)
    }

    /// Self-service registration.
    ///
    /// A login or email held by an unactivated account is reclaimed by
    /// deleting the stale record in the same transaction; one held by an
    /// activated account is a conflict.
    pub async fn register_user(&self, input: UserInput, password: &str) -> Result<User> {
        let mut tx = self.repo.begin().await?;
        let mut reclaimed = Vec::new();

        let login = input.login.to_lowercase();
        if let Some(existing) = self.repo.find_by_login(&mut *tx, &login).await? {
            if !Self::remove_non_activated_user(&self.repo, &mut tx, &existing).await? {
                return Err(ServerError::LoginConflict);
            }
            reclaimed.push(existing);
        }

        if let Some(email) = &input.email {
            if let Some(existing) = self.repo.find_by_email(&mut *tx, email).await? {
                if !Self::remove_non_activated_user(&self.repo, &mut tx, &existing).await? {
                    return Err(ServerError::EmailConflict);
                }
                reclaimed.push(existing);
            }
        }

        let mut user = User::builder()
            .login(login)
            .email(input.email)
            .first_name(input.first_name)
            .last_name(input.last_name)
            .image_url(input.image_url)
            .lang_key(input.lang_key)
            .build();
        user.password_hash = self.hash(password)?;
        user.activated = false;
        user.activation_key = Some(crypto::generate_activation_key());
        // the base role; silently omitted if missing from the catalog.
        user.authorities = self
            .roles
            .find(ROLE_USER)
            .await?
            .map(|role| vec![role.name])
            .unwrap_or_default();

        user.id = self.repo.insert(&mut tx, &user).await?;
        tx.commit().await?;

        for old in &reclaimed {
            self.cache.evict(old);
        }
        self.cache.evict(&user);

        tracing::debug!(login = user.login, "created information for user");
        Ok(user)
    }

    /// Deletes the record when it never finished activation; keeps it (and
    /// reports `false`) otherwise.
    async fn remove_non_activated_user(
        repo: &UserRepository,
        tx: &mut Transaction<'static, Postgres>,
        existing: &User,
    ) -> Result<bool> {
        if existing.activated {
            return Ok(false);
        }
        repo.delete(&mut **tx, existing.id).await?;
        Ok(true)
    }

    /// Consume an activation key.
    ///
    /// The key is cleared in the same update that flips the flag, so a
    /// second presentation of the same key resolves to absent.
    pub async fn activate_registration(&self, key: &str) -> Result<Option<User>> {
        tracing::debug!(key, "activating user for activation key");
        let mut tx = self.repo.begin().await?;

        let Some(mut user) = self.repo.find_by_activation_key(&mut *tx, key).await? else {
            return Ok(None);
        };

        user.activated = true;
        user.activation_key = None;
        self.repo.update(&mut tx, &user).await?;
        tx.commit().await?;
        self.cache.evict(&user);

        tracing::debug!(login = user.login, "activated user");
        Ok(Some(user))
    }

    /// Issue a single-use reset key to an activated account.
    ///
    /// Absent covers both "no such email" and "found but unactivated";
    /// callers must not let the two look different to the outside.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<User>> {
        let mut tx = self.repo.begin().await?;

        let Some(mut user) = self
            .repo
            .find_by_email(&mut *tx, email)
            .await?
            .filter(|user| user.activated)
        else {
            return Ok(None);
        };

        user.reset_key = Some(crypto::generate_reset_key());
        user.reset_date = Some(Utc::now());
        self.repo.update(&mut tx, &user).await?;
        tx.commit().await?;
        self.cache.evict(&user);

        Ok(Some(user))
    }

    /// Consume a reset key and store the new password.
    ///
    /// Expired and unknown keys are indistinguishable: both are absent.
    pub async fn complete_password_reset(
        &self,
        new_password: &str,
        key: &str,
    ) -> Result<Option<User>> {
        tracing::debug!(key, "reset user password for reset key");
        let mut tx = self.repo.begin().await?;

        let window_start = Utc::now() - Duration::hours(RESET_WINDOW_HOURS);
        let Some(mut user) = self
            .repo
            .find_by_reset_key(&mut *tx, key)
            .await?
            .filter(|user| user.reset_date.is_some_and(|date| date > window_start))
        else {
            return Ok(None);
        };

        user.password_hash = self.hash(new_password)?;
        user.reset_key = None;
        user.reset_date = None;
        self.repo.update(&mut tx, &user).await?;
        tx.commit().await?;
        self.cache.evict(&user);

        Ok(Some(user))
    }

    /// Rotate the password of the acting account after verifying the
    /// current one. A mismatch alters nothing.
    pub async fn change_password(
        &self,
        login: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let mut tx = self.repo.begin().await?;

        let Some(mut user) = self.repo.find_by_login(&mut *tx, &login.to_lowercase()).await?
        else {
            return Ok(());
        };

        if !self
            .pwd
            .verify_password(current_password, &user.password_hash)
        {
            return Err(ServerError::InvalidCredential);
        }

        user.password_hash = self.hash(new_password)?;
        self.repo.update(&mut tx, &user).await?;
        tx.commit().await?;
        self.cache.evict(&user);

        tracing::debug!(login = user.login, "changed password for user");
        Ok(())
    }

    /// Administrative account creation.
    ///
    /// The account starts activated with a throwaway random password; a
    /// reset key is issued so its owner can claim a real one. Unknown role
    /// identifiers are dropped, never stored.
    pub async fn create_user(&self, input: UserInput) -> Result<User> {
        let mut user = User::builder()
            .login(input.login)
            .email(input.email)
            .first_name(input.first_name)
            .last_name(input.last_name)
            .image_url(input.image_url)
            .lang_key(input.lang_key)
            .build();
        user.password_hash = self.hash(&crypto::generate_password())?;
        user.activated = true;
        user.reset_key = Some(crypto::generate_reset_key());
        user.reset_date = Some(Utc::now());
        user.authorities = self.roles.filter_known(&input.authorities).await?;

        let mut tx = self.repo.begin().await?;
        user.id = self.repo.insert(&mut tx, &user).await?;
        tx.commit().await?;
        self.cache.evict(&user);

        tracing::debug!(login = user.login, "created information for user");
        Ok(user)
    }

    /// Administrative update of every mutable field, authorities included.
    ///
    /// Both the pre-mutation and post-mutation cache images are evicted, so
    /// a changed login or email leaves no stale entry under the old keys.
    pub async fn update_user(&self, input: UserInput) -> Result<Option<User>> {
        let Some(id) = input.id else {
            return Ok(None);
        };

        let mut tx = self.repo.begin().await?;
        let Some(before) = self.repo.find_by_id(&mut *tx, id).await? else {
            return Ok(None);
        };

        let mut user = before.clone();
        user.login = input.login.to_lowercase();
        user.first_name = input.first_name;
        user.last_name = input.last_name;
        if let Some(email) = input.email {
            user.email = Some(email.to_lowercase());
        }
        user.image_url = input.image_url;
        user.activated = input.activated;
        if user.activated {
            // an activated account never keeps a pending activation key.
            user.activation_key = None;
        }
        if let Some(lang_key) = input.lang_key {
            user.lang_key = lang_key;
        }
        // a new filtered set replaces the old one, rather than editing it
        // in place.
        user.authorities = self.roles.filter_known(&input.authorities).await?;

        self.repo.update(&mut tx, &user).await?;
        self.repo
            .replace_authorities(&mut tx, user.id, &user.authorities)
            .await?;
        tx.commit().await?;

        self.cache.evict(&before);
        self.cache.evict(&user);

        tracing::debug!(login = user.login, "changed information for user");
        Ok(Some(user))
    }

    /// Self-service profile update for the acting account.
    ///
    /// Restricted to profile fields; silently no-ops when the session does
    /// not resolve to a persisted account.
    pub async fn update_account(&self, login: &str, profile: ProfileInput) -> Result<()> {
        let mut tx = self.repo.begin().await?;

        let Some(before) = self.repo.find_by_login(&mut *tx, &login.to_lowercase()).await?
        else {
            return Ok(());
        };

        if let Some(email) = &profile.email {
            if let Some(other) = self.repo.find_by_email(&mut *tx, email).await? {
                if other.id != before.id {
                    return Err(ServerError::EmailConflict);
                }
            }
        }

        let mut user = before.clone();
        user.first_name = profile.first_name;
        user.last_name = profile.last_name;
        if let Some(email) = profile.email {
            user.email = Some(email.to_lowercase());
        }
        if let Some(lang_key) = profile.lang_key {
            user.lang_key = lang_key;
        }
        user.image_url = profile.image_url;

        self.repo.update(&mut tx, &user).await?;
        tx.commit().await?;

        self.cache.evict(&before);
        self.cache.evict(&user);

        tracing::debug!(login = user.login, "changed information for user");
        Ok(())
    }

    /// Delete by login. Unknown logins are a no-op.
    pub async fn delete_user(&self, login: &str) -> Result<()> {
        let mut tx = self.repo.begin().await?;

        let Some(user) = self.repo.find_by_login(&mut *tx, &login.to_lowercase()).await? else {
            return Ok(());
        };

        self.repo.delete(&mut *tx, user.id).await?;
        tx.commit().await?;
        self.cache.evict(&user);

        tracing::debug!(login = user.login, "deleted user");
        Ok(())
    }

    /// Purge accounts that never finished activation within the retention
    /// window. Runs on a schedule, one transaction per batch.
    pub async fn remove_not_activated_users(&self) -> Result<usize> {
        let threshold = Utc::now() - Duration::days(STALE_RETENTION_DAYS);

        let mut tx = self.repo.begin().await?;
        let stale = self.repo.find_stale_unactivated(&mut *tx, threshold).await?;
        for user in &stale {
            tracing::debug!(login = user.login, "deleting not activated user");
            self.repo.delete(&mut *tx, user.id).await?;
        }
        tx.commit().await?;

        for user in &stale {
            self.cache.evict(user);
        }

        Ok(stale.len())
    }

    /// Resolve a login through the by-login cache.
    pub async fn find_with_authorities(&self, login: &str) -> Result<Option<User>> {
        let login = login.to_lowercase();
        if let Some(user) = self.cache.get_by_login(&login) {
            return Ok(Some(user));
        }

        let user = self.repo.find_by_login(self.repo.pool(), &login).await?;
        if let Some(user) = &user {
            self.cache.store(user);
        }
        Ok(user)
    }

    /// Resolve an email through the by-email cache.
    pub async fn find_by_email_cached(&self, email: &str) -> Result<Option<User>> {
        if let Some(user) = self.cache.get_by_email(email) {
            return Ok(Some(user));
        }

        let user = self.repo.find_by_email(self.repo.pool(), email).await?;
        if let Some(user) = &user {
            self.cache.store(user);
        }
        Ok(user)
    }

    /// Page over every account, for the administrative listing.
    pub async fn list(&self, page: i64, size: i64) -> Result<Vec<User>> {
        self.repo
            .find_all(self.repo.pool(), size, page * size)
            .await
    }

    /// All role identifiers of the catalog.
    pub async fn authorities(&self) -> Result<Vec<String>> {
        Ok(self
            .roles
            .list()
            .await?
            .into_iter()
            .map(|role| role.name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Pool, Postgres};

    fn service(pool: Pool<Postgres>) -> UserService {
        UserService::new(
            pool,
            Arc::new(UserCache::new()),
            Arc::new(PasswordManager::new(None).unwrap()),
        )
    }

    fn input(login: &str, email: &str) -> UserInput {
        UserInput {
            login: login.to_string(),
            email: Some(email.to_string()),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            ..Default::default()
        }
    }

    #[sqlx::test]
    async fn test_register_sets_activation_state(pool: Pool<Postgres>) {
        let users = service(pool);

        let user = users
            .register_user(input("Alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();

        assert_eq!(user.login, "alice");
        assert_eq!(user.email.as_deref(), Some("alice@x.com"));
        assert!(!user.activated);
        assert!(user.activation_key.is_some());
        assert_eq!(user.authorities, vec![ROLE_USER.to_string()]);

        let found = users.find_with_authorities("alice").await.unwrap().unwrap();
        assert!(!found.activated);
        assert_eq!(found.activation_key, user.activation_key);
    }

    #[sqlx::test]
    async fn test_register_conflicts_with_activated_login(pool: Pool<Postgres>) {
        let users = service(pool);

        let user = users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        users
            .activate_registration(user.activation_key.as_deref().unwrap())
            .await
            .unwrap();

        let err = users
            .register_user(input("alice", "other@x.com"), "Sup3rSecret")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::LoginConflict));
    }

    #[sqlx::test]
    async fn test_register_conflicts_with_activated_email(pool: Pool<Postgres>) {
        let users = service(pool);

        let user = users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        users
            .activate_registration(user.activation_key.as_deref().unwrap())
            .await
            .unwrap();

        let err = users
            .register_user(input("bob", "Alice@X.com"), "Sup3rSecret")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::EmailConflict));
    }

    #[sqlx::test]
    async fn test_register_reclaims_unactivated_login(pool: Pool<Postgres>) {
        let users = service(pool.clone());

        let first = users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();

        // never activated: the login is reclaimable.
        let second = users
            .register_user(input("alice", "alice@x.com"), "An0therSecret")
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_ne!(first.activation_key, second.activation_key);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE login = 'alice'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // the first activation key died with the first record.
        assert!(
            users
                .activate_registration(first.activation_key.as_deref().unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[sqlx::test]
    async fn test_activation_key_is_single_use(pool: Pool<Postgres>) {
        let users = service(pool);

        let user = users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        let key = user.activation_key.unwrap();

        let activated = users.activate_registration(&key).await.unwrap().unwrap();
        assert!(activated.activated);
        assert!(activated.activation_key.is_none());

        // second presentation of the same key: absent, state untouched.
        assert!(users.activate_registration(&key).await.unwrap().is_none());
        let found = users.find_with_authorities("alice").await.unwrap().unwrap();
        assert!(found.activated);
    }

    #[sqlx::test]
    async fn test_activate_unknown_key_is_absent(pool: Pool<Postgres>) {
        let users = service(pool);
        assert!(
            users
                .activate_registration("nonexistentkey")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[sqlx::test]
    async fn test_reset_requires_activated_account(pool: Pool<Postgres>) {
        let users = service(pool);

        let user = users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();

        // not activated yet: no reset key is issued.
        assert!(
            users
                .request_password_reset("alice@x.com")
                .await
                .unwrap()
                .is_none()
        );
        // unknown email behaves the same.
        assert!(
            users
                .request_password_reset("ghost@x.com")
                .await
                .unwrap()
                .is_none()
        );

        users
            .activate_registration(user.activation_key.as_deref().unwrap())
            .await
            .unwrap();

        let reset = users
            .request_password_reset("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        assert!(reset.reset_key.is_some());
        assert!(reset.reset_date.is_some());
    }

    #[sqlx::test]
    async fn test_reset_key_within_window(pool: Pool<Postgres>) {
        let users = service(pool.clone());

        let user = users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        users
            .activate_registration(user.activation_key.as_deref().unwrap())
            .await
            .unwrap();
        let reset = users
            .request_password_reset("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        let key = reset.reset_key.unwrap();

        let updated = users
            .complete_password_reset("NewPass1", &key)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.reset_key.is_none());
        assert!(updated.reset_date.is_none());

        let pwd = PasswordManager::new(None).unwrap();
        assert!(pwd.verify_password("NewPass1", &updated.password_hash));

        // the key was consumed.
        assert!(
            users
                .complete_password_reset("OtherPass", &key)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[sqlx::test]
    async fn test_reset_key_expires_after_window(pool: Pool<Postgres>) {
        let users = service(pool.clone());

        let user = users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        users
            .activate_registration(user.activation_key.as_deref().unwrap())
            .await
            .unwrap();
        let reset = users
            .request_password_reset("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        let key = reset.reset_key.unwrap();

        // age the issuance past the 24-hour window.
        sqlx::query("UPDATE users SET reset_date = now() - INTERVAL '25 hours' WHERE login = $1")
            .bind("alice")
            .execute(&pool)
            .await
            .unwrap();

        assert!(
            users
                .complete_password_reset("NewPass1", &key)
                .await
                .unwrap()
                .is_none()
        );

        // password unchanged.
        let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE login = $1")
            .bind("alice")
            .fetch_one(&pool)
            .await
            .unwrap();
        let pwd = PasswordManager::new(None).unwrap();
        assert!(pwd.verify_password("Sup3rSecret", &hash));
    }

    #[sqlx::test]
    async fn test_change_password_checks_current(pool: Pool<Postgres>) {
        let users = service(pool);

        users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();

        let err = users
            .change_password("alice", "WrongCurrent", "NewPass1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidCredential));

        users
            .change_password("alice", "Sup3rSecret", "NewPass1")
            .await
            .unwrap();
        let found = users.find_with_authorities("alice").await.unwrap().unwrap();
        let pwd = PasswordManager::new(None).unwrap();
        assert!(pwd.verify_password("NewPass1", &found.password_hash));
    }

    #[sqlx::test]
    async fn test_delete_user_is_idempotent(pool: Pool<Postgres>) {
        let users = service(pool);

        // unknown login: no error.
        users.delete_user("ghost").await.unwrap();

        users
            .register_user(input("alice", "alice@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        users.delete_user("alice").await.unwrap();
        assert!(users.find_with_authorities("alice").await.unwrap().is_none());

        users.delete_user("alice").await.unwrap();
    }

    #[sqlx::test]
    async fn test_create_user_drops_unknown_authorities(pool: Pool<Postgres>) {
        let users = service(pool);

        let mut admin_input = input("bob", "bob@x.com");
        admin_input.authorities =
            vec![ROLE_USER.to_string(), "ROLE_SUPERHERO".to_string()];

        let user = users.create_user(admin_input).await.unwrap();
        assert!(user.activated);
        assert!(user.reset_key.is_some());
        assert!(user.reset_date.is_some());
        assert_eq!(user.authorities, vec![ROLE_USER.to_string()]);
    }

    #[sqlx::test]
    async fn test_admin_update_replaces_authorities(pool: Pool<Postgres>) {
        let users = service(pool);

        let mut admin_input = input("bob", "bob@x.com");
        admin_input.authorities = vec![ROLE_USER.to_string()];
        let user = users.create_user(admin_input).await.unwrap();

        let update = UserInput {
            id: Some(user.id),
            login: "bob".to_string(),
            email: Some("bob@x.com".to_string()),
            activated: true,
            authorities: vec!["ROLE_ADMIN".to_string(), "ROLE_NOPE".to_string()],
            ..Default::default()
        };
        let updated = users.update_user(update).await.unwrap().unwrap();
        assert_eq!(updated.authorities, vec!["ROLE_ADMIN".to_string()]);

        let found = users.find_with_authorities("bob").await.unwrap().unwrap();
        assert_eq!(found.authorities, vec!["ROLE_ADMIN".to_string()]);
    }

    #[sqlx::test]
    async fn test_update_missing_user_is_absent(pool: Pool<Postgres>) {
        let users = service(pool);

        let update = UserInput {
            id: Some(404),
            login: "ghost".to_string(),
            ..Default::default()
        };
        assert!(users.update_user(update).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn test_cache_is_evicted_on_rename(pool: Pool<Postgres>) {
        let users = service(pool);

        let user = users.create_user(input("bob", "bob@x.com")).await.unwrap();

        // prime both caches.
        users.find_with_authorities("bob").await.unwrap().unwrap();
        users.find_by_email_cached("bob@x.com").await.unwrap().unwrap();

        let update = UserInput {
            id: Some(user.id),
            login: "robert".to_string(),
            email: Some("robert@x.com".to_string()),
            activated: true,
            ..Default::default()
        };
        users.update_user(update).await.unwrap().unwrap();

        // the old keys must miss and fall through to the store, which no
        // longer has them.
        assert!(users.find_with_authorities("bob").await.unwrap().is_none());
        assert!(users.find_by_email_cached("bob@x.com").await.unwrap().is_none());

        let renamed = users.find_with_authorities("robert").await.unwrap().unwrap();
        assert_eq!(renamed.email.as_deref(), Some("robert@x.com"));
    }

    #[sqlx::test]
    async fn test_purge_removes_only_stale_unactivated(pool: Pool<Postgres>) {
        let users = service(pool.clone());

        users
            .register_user(input("stale", "stale@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        users
            .register_user(input("fresh", "fresh@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        let old_active = users
            .register_user(input("veteran", "veteran@x.com"), "Sup3rSecret")
            .await
            .unwrap();
        users
            .activate_registration(old_active.activation_key.as_deref().unwrap())
            .await
            .unwrap();

        // both "stale" and "veteran" are old, but only "stale" never
        // finished activation.
        sqlx::query(
            "UPDATE users SET created_date = now() - INTERVAL '4 days' WHERE login IN ($1, $2)",
        )
        .bind("stale")
        .bind("veteran")
        .execute(&pool)
        .await
        .unwrap();

        let removed = users.remove_not_activated_users().await.unwrap();
        assert_eq!(removed, 1);

        assert!(users.find_with_authorities("stale").await.unwrap().is_none());
        assert!(users.find_with_authorities("fresh").await.unwrap().is_some());
        assert!(users.find_with_authorities("veteran").await.unwrap().is_some());
    }

    #[sqlx::test]
    async fn test_profile_update_checks_email_conflict(pool: Pool<Postgres>) {
        let users = service(pool);

        users.create_user(input("bob", "bob@x.com")).await.unwrap();
        users.create_user(input("eve", "eve@x.com")).await.unwrap();

        let err = users
            .update_account(
                "eve",
                ProfileInput {
                    email: Some("bob@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::EmailConflict));

        // keeping your own email is not a conflict.
        users
            .update_account(
                "eve",
                ProfileInput {
                    first_name: Some("Evelyn".to_string()),
                    email: Some("eve@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let found = users.find_with_authorities("eve").await.unwrap().unwrap();
        assert_eq!(found.first_name.as_deref(), Some("Evelyn"));
    }

    #[sqlx::test]
    async fn test_profile_update_ignores_missing_account(pool: Pool<Postgres>) {
        let users = service(pool);

        users
            .update_account("ghost", ProfileInput::default())
            .await
            .unwrap();
    }
}
