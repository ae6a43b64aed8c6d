//! The registration endpoint for creating a user account.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use time::OffsetDateTime;

use crate::{
    Error, PasswordHash, ValidatedPassword,
    auth::{AuthEndpointState, AuthResponse, Credentials, encode_token},
    db::lock_connection,
    user::{create_user, normalise_email},
};

/// Create a user and log them in.
///
/// The password is checked for strength against the email address and
/// hashed before the database is touched.
pub async fn register_user(
    State(state): State<AuthEndpointState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    let Json(credentials) = body?;
    let email = normalise_email(&credentials.email)?;
    let password = ValidatedPassword::new(&credentials.password, &[email.as_str()])?;
    let password_hash = PasswordHash::new(password, state.auth_config.password_cost)?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;
        create_user(&email, password_hash, state.clock.now(), &connection)?
    };

    tracing::info!("registered user {}", user.id);

    let token = encode_token(user.id, OffsetDateTime::now_utc(), &state.auth_config)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State, http::StatusCode};
    use time::{Duration, macros::datetime};

    use crate::{
        AuthConfig, Error, FixedClock,
        auth::{AuthEndpointState, Credentials, decode_token},
        db::test_utils::get_test_connection,
    };

    use super::register_user;

    fn get_test_state() -> AuthEndpointState {
        AuthEndpointState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            auth_config: AuthConfig::new("foobar", Duration::hours(1)).with_password_cost(4),
            clock: Arc::new(FixedClock::new(datetime!(2024-01-01 00:00 UTC))),
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    #[tokio::test]
    async fn register_creates_user_and_token() {
        let state = get_test_state();

        let (status, Json(response)) = register_user(
            State(state.clone()),
            Ok(Json(credentials("Foo@Bar.baz", "averysafeandsecurepassword"))),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.user.email, "foo@bar.baz");
        assert_eq!(response.user.created_at, datetime!(2024-01-01 00:00 UTC));
        assert!(response.user.password_hash.verify("averysafeandsecurepassword").unwrap());
        assert_eq!(
            decode_token(&response.token, &state.auth_config),
            Ok(response.user.id)
        );
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let state = get_test_state();
        let body = credentials("foo@bar.baz", "averysafeandsecurepassword");
        register_user(State(state.clone()), Ok(Json(body.clone())))
            .await
            .unwrap();

        let result = register_user(State(state), Ok(Json(body))).await;

        assert_eq!(result.err(), Some(Error::DuplicateEmail));
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let result = register_user(
            State(get_test_state()),
            Ok(Json(credentials("foo", "averysafeandsecurepassword"))),
        )
        .await;

        assert_eq!(result.err(), Some(Error::InvalidEmail("foo".to_owned())));
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let result = register_user(
            State(get_test_state()),
            Ok(Json(credentials("foo@bar.baz", "password"))),
        )
        .await;

        assert!(matches!(result, Err(Error::TooWeak(_))));
    }
}
