//! Expense tracker is a REST backend for recording personal expenses.
//!
//! Users register and log in to receive a bearer token, then create, list,
//! update and soft-delete expenses organised into categories. Every record is
//! scoped to the user that created it.
//!
//! The interesting part of the crate is the data-access layer in [expense]
//! and [category]: list queries are built from optional filters with
//! positional parameters, paging and sorting follow a lenient policy (see
//! [listing]), deletes only stamp `deleted_at`, and updates merge the present
//! fields over the stored ones in a single statement.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
pub mod category;
mod clock;
mod database_id;
mod db;
mod endpoints;
mod error;
pub mod expense;
pub mod listing;
mod logging;
mod password;
mod routing;
mod user;

pub use app_state::AppState;
pub use auth::AuthConfig;
pub use clock::{Clock, FixedClock, SystemClock};
pub use database_id::{CategoryId, DatabaseId, ExpenseId};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use user::{User, UserId};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
