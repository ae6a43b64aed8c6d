//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors. Every expense and category query is scoped by one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The normalised email address the user logs in with.
    pub email: String,
    /// The user's password hash.
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    /// When the user registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the user was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Trim and lowercase `raw_email` and check that it is a valid email address.
///
/// # Errors
///
/// Returns [Error::InvalidEmail] if the address is not valid.
pub fn normalise_email(raw_email: &str) -> Result<String, Error> {
    let email = raw_email.trim().to_lowercase();

    if EmailAddress::is_valid(&email) {
        Ok(email)
    } else {
        Err(Error::InvalidEmail(raw_email.to_owned()))
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// `email` should already be normalised with [normalise_email].
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if another user registered `email`,
/// - or [Error::SqlError] if some other SQL error occurred.
pub fn create_user(
    email: &str,
    password_hash: PasswordHash,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<User, Error> {
    let now = now.to_offset(UtcOffset::UTC);

    connection
        .prepare(
            "INSERT INTO user (email, password, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             RETURNING id, email, password, created_at, updated_at",
        )?
        .query_row((email, password_hash.as_ref(), now), map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `email`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if `email` does not belong to a registered user,
/// - or [Error::SqlError] if there was some other SQL error.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, password, created_at, updated_at FROM user WHERE email = :email")?
        .query_row(&[(":email", &email)], map_user_row)
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserId::new(row.get(0)?),
        email: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}
