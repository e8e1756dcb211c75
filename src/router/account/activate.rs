use axum::extract::{Query, State};
use serde::Deserialize;

use crate::AppState;
use crate::error::{Result, ServerError};

#[derive(Debug, Deserialize)]
pub struct Params {
    key: String,
}

/// Handler to consume an activation key.
pub async fn handler(State(state): State<AppState>, Query(params): Query<Params>) -> Result<()> {
    state
        .users
        .activate_registration(&params.key)
        .await?
        .map(|_| ())
        .ok_or(ServerError::NotFound)
}
