//! Manage session tokens for the HTTP layer.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

pub const EXPIRATION_TIME: u64 = 60 * 60 * 24; // 24 hours, in seconds.

/// Pieces of information asserted on a token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Identifies the expiration time on or after which the token must not
    /// be accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the token was issued.
    pub iat: u64,
    /// Identifies the organization that issued the token.
    pub iss: String,
    /// Login of the account the token was issued to.
    pub sub: String,
}

/// Manage session tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    name: String,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    pub fn new(name: &str, secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS512,
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            name: name.to_owned(),
        }
    }

    /// Create a new signed token for a login.
    pub fn create(&self, login: &str) -> Result<String> {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| ServerError::Internal {
                details: "system clock before unix epoch".into(),
                source: Some(Box::new(err)),
            })?
            .as_secs();
        let header = Header::new(self.algorithm);
        let claims = Claims {
            exp: time + EXPIRATION_TIME,
            iat: time,
            iss: self.name.clone(),
            sub: login.to_owned(),
        };

        encode(&header, &claims, &self.encoding_key).map_err(|_| ServerError::Unauthorized)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(self.algorithm);
        Ok(decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| ServerError::Unauthorized)?
            .claims)
    }
}
