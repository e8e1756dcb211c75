use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::mail::Template::Activation;
use crate::router::Valid;
use crate::user::UserInput;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, max = 50, message = "Login must be 1 to 50 characters long."))]
    pub login: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 4, max = 100, message = "Password must be 4 to 100 characters."))]
    pub password: String,
    #[validate(length(max = 50, message = "First name is limited to 50 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 50, message = "Last name is limited to 50 characters."))]
    pub last_name: Option<String>,
    #[validate(length(min = 2, max = 10, message = "Language key must be 2 to 10 characters."))]
    pub lang_key: Option<String>,
    pub image_url: Option<String>,
}

/// Handler to register a new account.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<StatusCode> {
    let input = UserInput {
        login: body.login,
        email: Some(body.email),
        first_name: body.first_name,
        last_name: body.last_name,
        image_url: body.image_url,
        lang_key: body.lang_key,
        ..Default::default()
    };

    let user = state.users.register_user(input, &body.password).await?;

    // one activation notification per successful registration, detached
    // from the response.
    state.mail.send(Activation, &user);

    Ok(StatusCode::CREATED)
}

#[cfg(test)]
pub(super) mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use super::*;
    use crate::*;

    fn req_body(login: &str, email: &str) -> Body {
        Body {
            login: login.into(),
            email: email.into(),
            password: "Sup3rSecret".into(),
            first_name: Some("Alice".into()),
            last_name: None,
            lang_key: None,
            image_url: None,
        }
    }

    #[sqlx::test]
    async fn test_register_handler(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        let response = make_request(
            None,
            app,
            Method::POST,
            "/api/register",
            json!(req_body("alice", "alice@x.com")).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let activated: bool = sqlx::query_scalar("SELECT activated FROM users WHERE login = 'alice'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(!activated);
    }

    #[sqlx::test]
    async fn test_register_with_short_password(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let mut body = req_body("alice", "alice@x.com");
        body.password = "abc".into();

        let response = make_request(
            None,
            app,
            Method::POST,
            "/api/register",
            json!(body).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_register_taken_activated_login(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state.clone());

        let response = make_request(
            None,
            app.clone(),
            Method::POST,
            "/api/register",
            json!(req_body("alice", "alice@x.com")).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let key: String =
            sqlx::query_scalar("SELECT activation_key FROM users WHERE login = 'alice'")
                .fetch_one(&pool)
                .await
                .unwrap();
        state.users.activate_registration(&key).await.unwrap();

        let response = make_request(
            None,
            app,
            Method::POST,
            "/api/register",
            json!(req_body("alice", "elsewhere@x.com")).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
