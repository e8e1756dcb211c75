//! Handle database requests.

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, Transaction};

use crate::error::Result;
use crate::user::{Role, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a transaction covering one logical operation.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Underlying pool, for reads outside any transaction.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Find a user using `login` field.
    pub async fn find_by_login(
        &self,
        db: impl Executor<'_, Database = Postgres>,
        login: &str,
    ) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Login);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(login)
            .fetch_optional(db)
            .await?)
    }

    /// Find a user using `email` field, case-insensitively.
    pub async fn find_by_email(
        &self,
        db: impl Executor<'_, Database = Postgres>,
        email: &str,
    ) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Email);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(db)
            .await?)
    }

    /// Find a user holding this single-use activation key.
    pub async fn find_by_activation_key(
        &self,
        db: impl Executor<'_, Database = Postgres>,
        key: &str,
    ) -> Result<Option<User>> {
        let query = get_by_field_query(Field::ActivationKey);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(key)
            .fetch_optional(db)
            .await?)
    }

    /// Find a user holding this single-use reset key.
    pub async fn find_by_reset_key(
        &self,
        db: impl Executor<'_, Database = Postgres>,
        key: &str,
    ) -> Result<Option<User>> {
        let query = get_by_field_query(Field::ResetKey);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(key)
            .fetch_optional(db)
            .await?)
    }

    /// Find a user using `id` field.
    pub async fn find_by_id(&self, db: impl Executor<'_, Database = Postgres>, id: i64) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Id);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?)
    }

    /// Page over all users, oldest first.
    pub async fn find_all(
        &self,
        db: impl Executor<'_, Database = Postgres>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>> {
        let query = format!(
            "{} GROUP BY u.id ORDER BY u.id LIMIT $1 OFFSET $2",
            BASE_SELECT
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await?)
    }

    /// Unactivated accounts still holding an activation key, created before
    /// the given instant.
    pub async fn find_stale_unactivated(
        &self,
        db: impl Executor<'_, Database = Postgres>,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<User>> {
        let query = format!(
            "{} WHERE u.activated = FALSE AND u.activation_key IS NOT NULL \
             AND u.created_date < $1 GROUP BY u.id",
            BASE_SELECT
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(older_than)
            .fetch_all(db)
            .await?)
    }

    /// Insert [`User`] and its authorities, returning the generated id.
    pub async fn insert(&self, tx: &mut Transaction<'static, Postgres>, user: &User) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO users (login, email, password_hash, first_name, last_name,
                image_url, lang_key, activated, activation_key, reset_key, reset_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING id"#,
        )
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.image_url)
        .bind(&user.lang_key)
        .bind(user.activated)
        .bind(&user.activation_key)
        .bind(&user.reset_key)
        .bind(user.reset_date)
        .fetch_one(&mut **tx)
        .await?;

        self.replace_authorities(tx, id, &user.authorities).await?;

        Ok(id)
    }

    /// Write back every mutable field of an existing user.
    pub async fn update(&self, tx: &mut Transaction<'static, Postgres>, user: &User) -> Result<()> {
        sqlx::query(
            r#"UPDATE users
                SET login = $1, email = $2, password_hash = $3, first_name = $4,
                    last_name = $5, image_url = $6, lang_key = $7, activated = $8,
                    activation_key = $9, reset_key = $10, reset_date = $11,
                    last_modified_date = now()
                WHERE id = $12"#,
        )
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.image_url)
        .bind(&user.lang_key)
        .bind(user.activated)
        .bind(&user.activation_key)
        .bind(&user.reset_key)
        .bind(user.reset_date)
        .bind(user.id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Replace the authority set of a user with a new one.
    pub async fn replace_authorities(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user_id: i64,
        authorities: &[String],
    ) -> Result<()> {
        sqlx::query("DELETE FROM user_authority WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        for name in authorities {
            sqlx::query(
                r#"INSERT INTO user_authority (user_id, authority_name) VALUES ($1, $2)
                    ON CONFLICT DO NOTHING"#,
            )
            .bind(user_id)
            .bind(name)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Delete a user row. Already-removed rows are a no-op.
    pub async fn delete(&self, db: impl Executor<'_, Database = Postgres>, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(db)
            .await?;

        Ok(())
    }
}

/// Read-only access to the seeded role catalog.
#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new [`RoleRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look a role up by identifier.
    pub async fn find(&self, name: &str) -> Result<Option<Role>> {
        Ok(
            sqlx::query_as::<_, Role>("SELECT name FROM authorities WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// List the whole catalog.
    pub async fn list(&self) -> Result<Vec<Role>> {
        Ok(
            sqlx::query_as::<_, Role>("SELECT name FROM authorities ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Keep only identifiers present in the catalog; unknown ones are
    /// dropped without error.
    pub async fn filter_known(&self, names: &[String]) -> Result<Vec<String>> {
        let mut known = Vec::with_capacity(names.len());
        for name in names {
            if let Some(role) = self.find(name).await? {
                if !known.contains(&role.name) {
                    known.push(role.name);
                }
            }
        }
        Ok(known)
    }
}

#[derive(Debug, Clone)]
enum Field {
    Id,
    Login,
    Email,
    ActivationKey,
    ResetKey,
}

impl Field {
    fn predicate(&self) -> &'static str {
        match self {
            Field::Id => "u.id = $1",
            Field::Login => "u.login = $1",
            Field::Email => "LOWER(u.email) = LOWER($1)",
            Field::ActivationKey => "u.activation_key = $1",
            Field::ResetKey => "u.reset_key = $1",
        }
    }
}

const BASE_SELECT: &str = r#"SELECT
        u.id,
        u.login,
        u.email,
        u.password_hash,
        u.first_name,
        u.last_name,
        u.image_url,
        u.lang_key,
        u.activated,
        u.activation_key,
        u.reset_key,
        u.reset_date,
        u.created_date,
        u.last_modified_date,
        CASE
            WHEN COUNT(a.authority_name) = 0 THEN '[]'::jsonb
            ELSE JSONB_AGG(a.authority_name)
        END AS authorities
    FROM users u
    LEFT JOIN user_authority a ON a.user_id = u.id"#;

fn get_by_field_query(field: Field) -> String {
    format!(
        "{} WHERE {} GROUP BY u.id",
        BASE_SELECT,
        field.predicate()
    )
}
