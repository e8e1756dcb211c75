//! Typed builder for User.

use crate::user::User;

const DEFAULT_LANG_KEY: &str = "en";

/// [`User`] builder.
///
/// A login is required before [`UserBuilder::build`] becomes available;
/// login and email are normalized to lowercase on the way in.
#[derive(Debug, Clone)]
pub struct UserBuilder<Login> {
    login: Login,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
    lang_key: String,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present(pub String);

impl UserBuilder<Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            login: Missing,
            email: None,
            first_name: None,
            last_name: None,
            image_url: None,
            lang_key: DEFAULT_LANG_KEY.to_string(),
        }
    }

    /// Update `login` field on [`UserBuilder`].
    pub fn login(self, login: impl Into<String>) -> UserBuilder<Present> {
        UserBuilder {
            login: Present(login.into().to_lowercase()),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            image_url: self.image_url,
            lang_key: self.lang_key,
        }
    }
}

impl Default for UserBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Login> UserBuilder<Login> {
    /// Update `email` field on [`UserBuilder`].
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = email.map(|e| e.to_lowercase());
        self
    }

    /// Update `first_name` field on [`UserBuilder`].
    pub fn first_name(mut self, first_name: Option<String>) -> Self {
        self.first_name = first_name;
        self
    }

    /// Update `last_name` field on [`UserBuilder`].
    pub fn last_name(mut self, last_name: Option<String>) -> Self {
        self.last_name = last_name;
        self
    }

    /// Update `image_url` field on [`UserBuilder`].
    pub fn image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    /// Update `lang_key` field on [`UserBuilder`].
    pub fn lang_key(mut self, lang_key: Option<String>) -> Self {
        self.lang_key = lang_key.unwrap_or(DEFAULT_LANG_KEY.to_string());
        self
    }
}

impl UserBuilder<Present> {
    /// Build a [`User`] with normalized identity fields.
    pub fn build(self) -> User {
        User {
            login: self.login.0,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            image_url: self.image_url,
            lang_key: self.lang_key,
            ..Default::default()
        }
    }
}
