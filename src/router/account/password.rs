use axum::extract::State;
use axum::Extension;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::User;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    current_password: String,
    #[validate(length(min = 4, max = 100, message = "Password must be 4 to 100 characters."))]
    new_password: String,
}

/// Handler rotating the acting account's password.
pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<()> {
    state
        .users
        .change_password(&user.login, &body.current_password, &body.new_password)
        .await
}
