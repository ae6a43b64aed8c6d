//! Creating and checking the signed bearer tokens handed out on log-in.

use std::fmt::Debug;

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, PasswordHash, UserId};

/// The keys and settings for issuing and checking tokens.
///
/// Built once at startup from the server secret.
#[derive(Clone)]
pub struct AuthConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// How long a token stays valid after it is issued.
    pub token_duration: Duration,
    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,
}

impl AuthConfig {
    /// Create the token keys from `secret`.
    pub fn new(secret: &str, token_duration: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_duration,
            password_cost: PasswordHash::DEFAULT_COST,
        }
    }

    /// Use `cost` for hashing new passwords instead of the bcrypt default.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }
}

impl Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("keys", &"<redacted>")
            .field("token_duration", &self.token_duration)
            .field("password_cost", &self.password_cost)
            .finish()
    }
}

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// The ID of the user the token was issued to.
    sub: String,
    /// The time the token was issued, in seconds since the Unix epoch.
    iat: i64,
    /// The expiry time of the token, in seconds since the Unix epoch.
    exp: i64,
}

/// Issue a token for `user_id` that expires `token_duration` after `now`.
///
/// `now` should be the real time, tokens are checked against the system clock.
///
/// # Errors
///
/// Returns [Error::TokenCreation] if the token could not be signed.
pub fn encode_token(
    user_id: UserId,
    now: OffsetDateTime,
    config: &AuthConfig,
) -> Result<String, Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.unix_timestamp(),
        exp: (now + config.token_duration).unix_timestamp(),
    };

    encode(&Header::default(), &claims, &config.encoding_key)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Check the signature and expiry of `token` and return the user it was issued to.
///
/// # Errors
///
/// Returns [Error::InvalidToken] if the token is malformed, expired or was
/// signed with another key.
pub fn decode_token(token: &str, config: &AuthConfig) -> Result<UserId, Error> {
    let token_data = decode::<Claims>(token, &config.decoding_key, &Validation::default())
        .map_err(|error| {
            tracing::warn!("rejected bearer token: {error}");
            Error::InvalidToken
        })?;

    token_data
        .claims
        .sub
        .parse()
        .map(UserId::new)
        .map_err(|_| Error::InvalidToken)
}
