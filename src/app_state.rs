//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AuthConfig, Clock, Error, db::initialize, listing::PaginationConfig};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The source of the current time for stamping records.
    pub clock: Arc<dyn Clock>,

    /// The keys and settings for bearer tokens.
    pub auth_config: AuthConfig,

    /// The config that controls how to split lists into pages.
    pub pagination_config: PaginationConfig,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        clock: Arc<dyn Clock>,
        auth_config: AuthConfig,
        pagination_config: PaginationConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            clock,
            auth_config,
            pagination_config,
        })
    }
}

impl FromRef<AppState> for AuthConfig {
    fn from_ref(state: &AppState) -> Self {
        state.auth_config.clone()
    }
}
