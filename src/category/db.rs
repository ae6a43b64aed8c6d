//! Database operations for categories.

use rusqlite::{Connection, Row};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    CategoryId, Error, UserId,
    category::{Category, CategoryName, CategoryQuery, CategoryUpdate},
    db::LOWER_UNICODE,
    listing::{Predicates, escape_like, order_by_clause},
};

const CATEGORY_COLUMNS: &str = "id, user_id, name, created_at, updated_at, deleted_at";

/// Create the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES user(id),
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_category_user_id ON category(user_id, deleted_at);",
    )?;

    Ok(())
}

/// Create a category owned by `user_id` and return it with its generated ID.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the row could not be inserted.
pub fn create_category(
    user_id: UserId,
    name: CategoryName,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Category, Error> {
    let now = now.to_offset(UtcOffset::UTC);

    connection
        .prepare(&format!(
            "INSERT INTO category (user_id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row((user_id.as_i64(), name.as_ref(), now), map_row)
        .map_err(|error| error.into())
}

/// Retrieve one of `user_id`'s categories.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist, was deleted or
/// belongs to another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category
             WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL"
        ))?
        .query_row((category_id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Retrieve one page of `user_id`'s categories and the number of categories
/// matching `query` across all pages.
pub fn list_categories(
    query: &CategoryQuery,
    user_id: UserId,
    connection: &Connection,
) -> Result<(Vec<Category>, u64), Error> {
    let mut predicates = Predicates::owned_by("c", user_id);
    let search = query.search.as_deref().map(|search| escape_like(&search.to_lowercase()));
    predicates.push_some(search, |p| {
        format!("{LOWER_UNICODE}(c.name) LIKE '%' || {p} || '%' ESCAPE '\\'")
    });
    let where_clause = predicates.where_clause();

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM category c {where_clause}"),
        predicates.params(),
        |row| row.get(0),
    )?;
    let total = u64::try_from(total)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, total))?;

    let order_by = order_by_clause(query.sort, query.order, "c.id");
    let limit_clause = predicates.paginate(query.limit, query.offset);

    let categories = connection
        .prepare(&format!(
            "SELECT c.id, c.user_id, c.name, c.created_at, c.updated_at, c.deleted_at
             FROM category c {where_clause} {order_by} {limit_clause}"
        ))?
        .query_map(predicates.params(), map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((categories, total))
}

/// Apply the fields present in `update` to one of `user_id`'s categories.
///
/// `updated_at` is set to `now` even if `update` has no fields.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist, was deleted or
/// belongs to another user.
pub fn update_category(
    category_id: CategoryId,
    user_id: UserId,
    update: CategoryUpdate,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Category, Error> {
    let now = now.to_offset(UtcOffset::UTC);
    let name = update.name.as_ref().map(|name| name.as_ref().to_owned());

    connection
        .prepare(&format!(
            "UPDATE category
             SET name = COALESCE(?1, name), updated_at = ?2
             WHERE id = ?3 AND user_id = ?4 AND deleted_at IS NULL
             RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row((name, now, category_id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Soft-delete one of `user_id`'s categories.
///
/// Expenses that reference the category keep the reference but no longer
/// show its name.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist, was already
/// deleted or belongs to another user.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let now = now.to_offset(UtcOffset::UTC);

    let rows_affected = connection.execute(
        "UPDATE category SET deleted_at = ?1, updated_at = ?1
         WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
        (now, category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(2)?;

    Ok(Category {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: CategoryName::new_unchecked(&raw_name),
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        deleted_at: row.get(5)?,
    })
}
