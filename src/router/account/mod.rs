//! Account self-service HTTP API.
mod activate;
mod get;
mod password;
pub mod register;
mod reset;
mod update;

use axum::routing::{get, post};
use axum::{Router, middleware};

use crate::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    // Routes resolving the acting account. Authorization required.
    let authenticated = Router::new()
        // `GET /account` goes to `get`.
        .route("/account", get(get::handler))
        // `POST /account` goes to `update`.
        .route("/account", post(update::handler))
        // `POST /account/change-password` goes to `password`.
        .route("/account/change-password", post(password::handler))
        .route_layer(middleware::from_fn_with_state(state, crate::router::auth));

    Router::new()
        // `POST /register` goes to `register`.
        .route("/register", post(register::handler))
        // `GET /activate` goes to `activate`.
        .route("/activate", get(activate::handler))
        // password reset is reachable without a session, by design.
        .route("/account/reset-password/init", post(reset::init_handler))
        .route("/account/reset-password/finish", post(reset::finish_handler))
        .merge(authenticated)
}
