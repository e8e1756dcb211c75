use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::Valid;
use crate::user::{User, UserInput};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub id: i64,
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
    pub activated: bool,
    #[serde(default)]
    pub authorities: Vec<String>,
}

/// Handler replacing every mutable field of an account, authorities
/// included.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<User>> {
    let input = UserInput {
        id: Some(body.id),
        login: body.login,
        email: body.email,
        first_name: body.first_name,
        last_name: body.last_name,
        image_url: body.image_url,
        lang_key: body.lang_key,
        activated: body.activated,
        authorities: body.authorities,
    };

    state
        .users
        .update_user(input)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use super::*;
    use crate::*;

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_update_user_handler(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state.clone());

        let created = state
            .users
            .create_user(user::UserInput {
                login: "bob".into(),
                email: Some("bob@x.com".into()),
                authorities: vec![user::ROLE_USER.to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        let req_body = Body {
            id: created.id,
            login: "robert".into(),
            email: Some("robert@x.com".into()),
            first_name: Some("Robert".into()),
            last_name: None,
            image_url: None,
            lang_key: Some("fr".into()),
            activated: true,
            authorities: vec![user::ROLE_ADMIN.to_string()],
        };
        let response = make_request(
            Some(&state),
            app,
            Method::PUT,
            "/api/admin/users",
            json!(req_body).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let updated: user::User = serde_json::from_slice(&body).unwrap();
        assert_eq!(updated.login, "robert");
        assert_eq!(updated.lang_key, "fr");
        assert_eq!(updated.authorities, vec![user::ROLE_ADMIN.to_string()]);

        // the old login no longer resolves.
        assert!(
            state
                .users
                .find_with_authorities("bob")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_update_unknown_user(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state.clone());

        let req_body = Body {
            id: 404,
            login: "ghost".into(),
            email: None,
            first_name: None,
            last_name: None,
            image_url: None,
            lang_key: None,
            activated: false,
            authorities: Vec::new(),
        };
        let response = make_request(
            Some(&state),
            app,
            Method::PUT,
            "/api/admin/users",
            json!(req_body).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
