use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::user::User;

const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    page: Option<i64>,
    size: Option<i64>,
}

/// Handler returning one account by login.
pub async fn handler(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> Result<Json<User>> {
    state
        .users
        .find_with_authorities(&login)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound)
}

/// Handler paging over every account.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<User>>> {
    let page = pagination.page.unwrap_or(0).max(0);
    let size = pagination
        .size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, 100);

    Ok(Json(state.users.list(page, size).await?))
}
