//! Administrative users HTTP API. Requires `ROLE_ADMIN`.
mod create;
mod delete;
mod get;
mod update;

use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router, middleware};

use crate::AppState;
use crate::error::Result;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // `POST /users` goes to `create`.
        .route("/users", post(create::handler))
        // `PUT /users` goes to `update`.
        .route("/users", put(update::handler))
        // `GET /users` goes to `list`.
        .route("/users", get(get::list_handler))
        // `GET /users/:LOGIN` goes to `get`.
        .route("/users/{login}", get(get::handler))
        // `DELETE /users/:LOGIN` goes to `delete`.
        .route("/users/{login}", delete(delete::handler))
        // `GET /authorities` lists the role catalog.
        .route("/authorities", get(authorities_handler))
        .route_layer(middleware::from_fn(crate::router::require_admin))
        .route_layer(middleware::from_fn_with_state(state, crate::router::auth))
}

/// Handler listing every known role identifier.
async fn authorities_handler(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.users.authorities().await?))
}
