mod builder;
mod repository;
mod service;

pub use builder::*;
pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};

/// Base role granted to every self-registered account.
pub const ROLE_USER: &str = "ROLE_USER";
/// Role required for the administrative API.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// User as saved on database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub lang_key: String,
    pub activated: bool,
    #[serde(skip)]
    pub activation_key: Option<String>,
    #[serde(skip)]
    pub reset_key: Option<String>,
    #[serde(skip)]
    pub reset_date: Option<chrono::DateTime<chrono::Utc>>,
    pub created_date: chrono::DateTime<chrono::Utc>,
    pub last_modified_date: chrono::DateTime<chrono::Utc>,
    #[sqlx(json)]
    pub authorities: Vec<String>,
}

impl User {
    /// Create a builder for a new account.
    pub fn builder() -> UserBuilder<Missing> {
        UserBuilder::new()
    }

    /// Whether this account carries the given role.
    pub fn has_authority(&self, role: &str) -> bool {
        self.authorities.iter().any(|name| name == role)
    }
}

/// Role identifier from the seeded catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub name: String,
}

/// Administrative input for creating or updating an account.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub id: Option<i64>,
    pub login: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub lang_key: Option<String>,
    #[serde(default)]
    pub activated: bool,
    #[serde(default)]
    pub authorities: Vec<String>,
}

/// Self-service profile fields.
///
/// Never carries login, activation or authority state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub lang_key: Option<String>,
    pub image_url: Option<String>,
}
