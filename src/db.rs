//! Sets up the application database and hands out the shared connection.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior, functions::FunctionFlags};

use crate::{
    Error, category::create_category_table, expense::create_expense_table,
    user::create_user_table,
};

/// The SQL function that lower-cases text with Unicode case rules.
///
/// SQLite's built-in `lower` and `LIKE` only fold ASCII letters.
pub(crate) const LOWER_UNICODE: &str = "lower_unicode";

/// Register the custom SQL functions that the queries rely on.
///
/// Functions are registered per connection, so this must run on every
/// connection before it is queried.
///
/// # Errors
/// Returns an [Error::SqlError] if a function could not be registered.
pub fn register_functions(connection: &Connection) -> Result<(), Error> {
    connection.create_scalar_function(
        LOWER_UNICODE,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| {
            let text = context.get::<Option<String>>(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )?;

    Ok(())
}

/// Register the custom SQL functions and create the tables and indexes for
/// the domain models.
///
/// Safe to call on a database that has already been initialised.
///
/// # Errors
/// Returns an [Error::SqlError] if a function, table or index could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    register_functions(connection)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_expense_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Lock the shared database connection for the duration of one operation.
///
/// # Errors
/// Returns an [Error::DatabaseLockError] if another thread panicked while holding the lock.
pub(crate) fn lock_connection(
    connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
