use axum::extract::State;
use axum::Extension;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::{ProfileInput, User};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(max = 50, message = "First name is limited to 50 characters."))]
    first_name: Option<String>,
    #[validate(length(max = 50, message = "Last name is limited to 50 characters."))]
    last_name: Option<String>,
    #[validate(email(message = "Email must be formatted."))]
    email: Option<String>,
    #[validate(length(min = 2, max = 10, message = "Language key must be 2 to 10 characters."))]
    lang_key: Option<String>,
    image_url: Option<String>,
}

/// Handler updating the acting account's profile fields.
///
/// Login, activation state and authorities are never touched here.
pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<()> {
    let profile = ProfileInput {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        lang_key: body.lang_key,
        image_url: body.image_url,
    };

    state.users.update_account(&user.login, profile).await
}
