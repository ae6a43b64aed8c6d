//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An expense amount was zero, negative or not a finite number.
    #[error("amount must be a number greater than zero, got {0}")]
    InvalidAmount(f64),

    /// A currency code was not exactly three ASCII letters.
    #[error("currency must be a three letter code, got \"{0}\"")]
    InvalidCurrency(String),

    /// A timestamp could not be parsed as an RFC 3339 date-time.
    ///
    /// Callers should pass in the string that failed to parse.
    #[error("\"{0}\" is not a valid RFC 3339 timestamp")]
    InvalidTimestamp(String),

    /// A list filter parameter could not be parsed.
    ///
    /// The first string is the parameter name, the second the raw value.
    #[error("invalid value \"{1}\" for the filter \"{0}\"")]
    InvalidFilter(String, String),

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// The request body was not valid JSON or did not have the expected shape.
    #[error("invalid request body: {0}")]
    InvalidJson(String),

    /// A path parameter such as a resource ID could not be parsed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The email address used to register was not a valid email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The email address is already used by another user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The email and password combination did not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The bearer token was missing, malformed, expired or signed with another key.
    #[error("missing or invalid bearer token")]
    InvalidToken,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A bearer token could not be signed.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The requested resource was not found.
    ///
    /// This is also returned when the resource belongs to another user or
    /// has been deleted, so that callers cannot tell these cases apart.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref desc),
            ) if desc.ends_with("user.email") => Error::DuplicateEmail,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => Error::SqlError(error),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidJson(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidPath(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidAmount(_)
            | Error::InvalidCurrency(_)
            | Error::InvalidTimestamp(_)
            | Error::InvalidFilter(_, _)
            | Error::EmptyCategoryName
            | Error::InvalidJson(_)
            | Error::InvalidPath(_)
            | Error::InvalidEmail(_)
            | Error::TooWeak(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::DuplicateEmail => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
            // Any errors that are not handled above are not intended to be shown to the client.
            _ => {
                tracing::error!("An unexpected error occurred: {}", self);

                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response();
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
