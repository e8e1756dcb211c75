use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::mail::Template::Creation;
use crate::router::Valid;
use crate::user::{User, UserInput};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, max = 50, message = "Login must be 1 to 50 characters long."))]
    pub login: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: Option<String>,
    #[validate(length(max = 50, message = "First name is limited to 50 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 50, message = "Last name is limited to 50 characters."))]
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub lang_key: Option<String>,
    #[serde(default)]
    pub authorities: Vec<String>,
}

/// Handler creating an account on behalf of an administrator.
///
/// The account starts with a generated password; the notification tells
/// its owner to claim a real one through the reset flow.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<User>)> {
    let input = UserInput {
        login: body.login,
        email: body.email,
        first_name: body.first_name,
        last_name: body.last_name,
        image_url: body.image_url,
        lang_key: body.lang_key,
        authorities: body.authorities,
        ..Default::default()
    };

    let user = state.users.create_user(input).await?;

    state.mail.send(Creation, &user);

    Ok((StatusCode::CREATED, Json(user)))
}
