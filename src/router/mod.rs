//! HTTP routes, a thin layer over the user service.

pub mod account;
pub mod login;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::user::User;

const BEARER: &str = "Bearer ";

/// Json extractor running body validation.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Custom middleware for authentification.
///
/// Resolves the acting account from the `Authorization` header and stores
/// it as a request extension.
pub async fn auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(ServerError::Unauthorized)?;
    let token = token.strip_prefix(BEARER).unwrap_or(token);

    let claims = state.token.decode(token)?;
    let user = state
        .users
        .find_with_authorities(&claims.sub)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    req.extensions_mut().insert::<User>(user);
    Ok(next.run(req).await)
}

/// Reject non-administrators. Must run below [`auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response> {
    let user = req
        .extensions()
        .get::<User>()
        .ok_or(ServerError::Unauthorized)?;

    if !user.has_authority(crate::user::ROLE_ADMIN) {
        return Err(ServerError::Forbidden);
    }

    Ok(next.run(req).await)
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub fn state(pool: sqlx::PgPool) -> AppState {
    use std::sync::Arc;

    use crate::cache::UserCache;
    use crate::crypto::PasswordManager;
    use crate::user::UserService;

    let cache = Arc::new(UserCache::new());
    let pwd = Arc::new(PasswordManager::new(None).expect("default argon2 parameters"));

    AppState {
        config: Arc::new(crate::config::Configuration::default()),
        db: crate::database::Database {
            postgres: pool.clone(),
        },
        users: UserService::new(pool, Arc::clone(&cache), Arc::clone(&pwd)),
        cache,
        pwd,
        token: crate::token::TokenManager::new("accountd", "a test-only signing secret"),
        mail: crate::mail::MailManager::default(),
    }
}
