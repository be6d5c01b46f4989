//! HS256 JSON Web Tokens returned by a successful login.

use chrono::{Duration, Utc};
use domains::{AuthError, TokenIssuer, User};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id, as a string per RFC 7519.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtIssuer {
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl JwtIssuer {
    pub fn new(secret: &SecretString, ttl: std::time::Duration) -> Result<Self, AuthError> {
        let bytes = secret.expose_secret().as_bytes();
        let ttl = Duration::from_std(ttl).map_err(|e| AuthError::Token(e.to_string()))?;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(bytes),
            ttl,
        })
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Token(e.to_string()))
    }
}
