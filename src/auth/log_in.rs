//! The log-in endpoint that swaps an email and password for a bearer token.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, AuthConfig, Clock, Error, User,
    auth::encode_token,
    db::lock_connection,
    user::{get_user_by_email, normalise_email},
};

/// The state needed for registering and logging in users.
#[derive(Debug, Clone)]
pub struct AuthEndpointState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys for signing tokens and the bcrypt cost.
    pub auth_config: AuthConfig,
    /// Stamps newly registered users.
    pub clock: Arc<dyn Clock>,
}

impl FromRef<AppState> for AuthEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            auth_config: state.auth_config.clone(),
            clock: state.clock.clone(),
        }
    }
}

/// The email and password a user registers or logs in with.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// The user's email address.
    pub email: String,
    /// The user's password in plain text.
    pub password: String,
}

/// The response to a successful registration or log-in.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The bearer token for the API routes.
    pub token: String,
    /// The authenticated user.
    pub user: User,
}

/// Check the user's credentials and issue a bearer token.
///
/// An unknown email and a wrong password give the same error.
pub async fn post_log_in(
    State(state): State<AuthEndpointState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, Error> {
    let Json(credentials) = body?;
    let email = normalise_email(&credentials.email).map_err(|_| Error::InvalidCredentials)?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;
        get_user_by_email(&email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    if !user.password_hash.verify(&credentials.password)? {
        tracing::debug!("wrong password for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(user.id, OffsetDateTime::now_utc(), &state.auth_config)?;

    Ok(Json(AuthResponse { token, user }))
}
