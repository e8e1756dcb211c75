use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::AppState;
use crate::error::Result;

/// Handler deleting an account by login. Unknown logins are a no-op.
pub async fn handler(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> Result<StatusCode> {
    state.users.delete_user(&login).await?;
    Ok(StatusCode::NO_CONTENT)
}
