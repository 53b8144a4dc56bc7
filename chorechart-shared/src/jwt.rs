use jsonwebtoken::{self, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Username at the time the token was issued.
    pub sub: String,
    /// Database id of the user.
    pub uid: i32,
    pub jti: String,
    pub exp: i64,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Decode(String),
    #[error("encoding failed: {0}")]
    Encode(String),
}

pub fn decode_and_verify(token: &str, secret: &[u8]) -> Result<JwtClaims, JwtError> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<JwtClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::Decode(e.to_string()))
}

pub fn encode(token: &JwtClaims, secret: &[u8]) -> Result<String, JwtError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        token,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| JwtError::Encode(e.to_string()))
}
