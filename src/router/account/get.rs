use axum::{Extension, Json};

use crate::error::Result;
use crate::user::User;

/// Handler returning the acting account, authorities included.
pub async fn handler(Extension(user): Extension<User>) -> Result<Json<User>> {
    Ok(Json(user))
}
