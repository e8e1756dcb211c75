//! Credential login issuing a session token.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, max = 254, message = "Username must not be empty."))]
    pub username: String,
    #[validate(length(min = 4, max = 100, message = "Password must be 4 to 100 characters."))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id_token: String,
}

/// Handler to authenticate a user by login or email.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let user = if body.username.contains('@') {
        state.users.find_by_email_cached(&body.username).await?
    } else {
        state.users.find_with_authorities(&body.username).await?
    };

    // unknown accounts, unactivated accounts and bad passwords must all
    // look the same from outside.
    let Some(user) = user.filter(|user| user.activated) else {
        return Err(ServerError::Unauthorized);
    };
    if !state.pwd.verify_password(&body.password, &user.password_hash) {
        return Err(ServerError::Unauthorized);
    }

    let id_token = state.token.create(&user.login)?;

    Ok(Json(Response { id_token }))
}
