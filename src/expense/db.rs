//! Database operations for expenses.

use rusqlite::{Connection, Row};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error, ExpenseId, UserId,
    db::LOWER_UNICODE,
    expense::{Currency, Expense, ExpenseQuery, ExpenseUpdate, NewExpense},
    listing::{Predicates, escape_like, order_by_clause},
};

/// Selects an expense with the name of its category.
///
/// The join only matches a live category owned by the same user, so a
/// category ID pointing at someone else's category never leaks its name.
const SELECT_EXPENSE: &str = "SELECT e.id, e.user_id, e.category_id, c.name, e.amount, e.currency,
        e.occurred_at, e.comment, e.created_at, e.updated_at, e.deleted_at
    FROM expense e
    LEFT JOIN category c
        ON c.id = e.category_id AND c.user_id = e.user_id AND c.deleted_at IS NULL";

/// Create the expense table and indexes.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES user(id),
            category_id INTEGER,
            amount REAL NOT NULL CHECK (amount > 0),
            currency TEXT NOT NULL CHECK (length(currency) = 3),
            occurred_at TEXT NOT NULL,
            comment TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_occurred_at ON expense(user_id, occurred_at);
        CREATE INDEX IF NOT EXISTS idx_expense_category_id ON expense(category_id);",
    )?;

    Ok(())
}

/// Record a new expense for `user_id`.
///
/// The category ID is stored as given. It is not checked against the
/// category table, reads only show the name of a live category owned by
/// the same user.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the row could not be inserted.
pub fn create_expense(
    user_id: UserId,
    expense: NewExpense,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Expense, Error> {
    let now = now.to_offset(UtcOffset::UTC);

    connection.execute(
        "INSERT INTO expense
            (user_id, category_id, amount, currency, occurred_at, comment, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        (
            user_id.as_i64(),
            expense.category_id,
            expense.amount,
            expense.currency.as_ref(),
            expense.occurred_at.to_offset(UtcOffset::UTC),
            expense.comment,
            now,
        ),
    )?;

    let id = connection.last_insert_rowid();

    get_expense(id, user_id, connection)
}

/// Retrieve one of `user_id`'s expenses.
///
/// # Errors
///
/// Returns [Error::NotFound] if the expense does not exist, was deleted or
/// belongs to another user.
pub fn get_expense(
    expense_id: ExpenseId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Expense, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE e.id = ?1 AND e.user_id = ?2 AND e.deleted_at IS NULL"
        ))?
        .query_row((expense_id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Retrieve one page of `user_id`'s expenses and the number of expenses
/// matching `query` across all pages.
///
/// The count and the page are built from the same predicates.
pub fn list_expenses(
    query: &ExpenseQuery,
    user_id: UserId,
    connection: &Connection,
) -> Result<(Vec<Expense>, u64), Error> {
    let utc = |timestamp: OffsetDateTime| timestamp.to_offset(UtcOffset::UTC);

    let mut predicates = Predicates::owned_by("e", user_id);
    predicates.push_some(query.occurred_from.map(utc), |p| {
        format!("e.occurred_at >= {p}")
    });
    predicates.push_some(query.occurred_to.map(utc), |p| format!("e.occurred_at <= {p}"));
    predicates.push_some(query.category_id, |p| format!("e.category_id = {p}"));
    predicates.push_some(query.min_amount, |p| format!("e.amount >= {p}"));
    predicates.push_some(query.max_amount, |p| format!("e.amount <= {p}"));
    let search = query.search.as_deref().map(|search| escape_like(&search.to_lowercase()));
    predicates.push_some(search, |p| {
        format!("{LOWER_UNICODE}(e.comment) LIKE '%' || {p} || '%' ESCAPE '\\'")
    });
    let where_clause = predicates.where_clause();

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM expense e {where_clause}"),
        predicates.params(),
        |row| row.get(0),
    )?;
    let total = u64::try_from(total)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, total))?;

    let order_by = order_by_clause(query.sort, query.order, "e.id");
    let limit_clause = predicates.paginate(query.limit, query.offset);

    let expenses = connection
        .prepare(&format!(
            "{SELECT_EXPENSE} {where_clause} {order_by} {limit_clause}"
        ))?
        .query_map(predicates.params(), map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((expenses, total))
}

/// Apply the fields present in `update` to one of `user_id`'s expenses and
/// return the stored result.
///
/// All fields are merged in one statement. `updated_at` is set to `now` even
/// if `update` has no fields.
///
/// # Errors
///
/// Returns [Error::NotFound] if the expense does not exist, was deleted or
/// belongs to another user.
pub fn update_expense(
    expense_id: ExpenseId,
    user_id: UserId,
    update: ExpenseUpdate,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Expense, Error> {
    let now = now.to_offset(UtcOffset::UTC);

    let rows_affected = connection.execute(
        "UPDATE expense SET
            amount = COALESCE(?1, amount),
            currency = COALESCE(?2, currency),
            occurred_at = COALESCE(?3, occurred_at),
            category_id = COALESCE(?4, category_id),
            comment = COALESCE(?5, comment),
            updated_at = ?6
         WHERE id = ?7 AND user_id = ?8 AND deleted_at IS NULL",
        (
            update.amount,
            update.currency.as_ref().map(|currency| currency.as_ref()),
            update
                .occurred_at
                .map(|occurred_at| occurred_at.to_offset(UtcOffset::UTC)),
            update.category_id,
            update.comment,
            now,
            expense_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_expense(expense_id, user_id, connection)
}

/// Soft-delete one of `user_id`'s expenses.
///
/// # Errors
///
/// Returns [Error::NotFound] if the expense does not exist, was already
/// deleted or belongs to another user.
pub fn delete_expense(
    expense_id: ExpenseId,
    user_id: UserId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let now = now.to_offset(UtcOffset::UTC);

    let rows_affected = connection.execute(
        "UPDATE expense SET deleted_at = ?1, updated_at = ?1
         WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
        (now, expense_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let raw_currency: String = row.get(5)?;

    Ok(Expense {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        amount: row.get(4)?,
        currency: Currency::new_unchecked(&raw_currency),
        occurred_at: row.get(6)?,
        comment: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        deleted_at: row.get(10)?,
    })
}

#[cfg(test)]
mod expense_query_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        Error, UserId,
        category::{CategoryName, create_category, delete_category},
        db::test_utils::{create_test_user, get_test_connection},
        expense::{
            Amount, Currency, Expense, ExpenseQuery, ExpenseSortField, ExpenseUpdate, NewExpense,
            create_expense, delete_expense, get_expense, list_expenses, update_expense,
        },
        listing::SortOrder,
    };

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

    fn get_test_db() -> (Connection, UserId) {
        let connection = get_test_connection();
        let user_id = create_test_user("test@example.com", &connection);

        (connection, user_id)
    }

    fn new_expense(amount: f64, occurred_at: OffsetDateTime) -> NewExpense {
        NewExpense {
            amount: Amount::new_unchecked(amount),
            currency: Currency::new_unchecked("USD"),
            occurred_at,
            category_id: None,
            comment: None,
        }
    }

    fn create_test_expense(amount: f64, user_id: UserId, connection: &Connection) -> Expense {
        create_expense(
            user_id,
            new_expense(amount, datetime!(2024-01-01 00:00 UTC)),
            NOW,
            connection,
        )
        .expect("Could not create test expense")
    }

    fn amounts(expenses: &[Expense]) -> Vec<f64> {
        expenses.iter().map(|e| e.amount.as_f64()).collect()
    }

    #[test]
    fn create_then_delete_hides_expense() {
        let (connection, user_id) = get_test_db();

        let expense = create_expense(
            user_id,
            new_expense(12.5, datetime!(2024-01-01 00:00 UTC)),
            NOW,
            &connection,
        )
        .unwrap();

        assert!(expense.id > 0);
        assert_eq!(expense.created_at, expense.updated_at);
        assert_eq!(expense.deleted_at, None);
        assert_eq!(expense.currency.as_ref(), "USD");
        assert_eq!(expense.occurred_at, datetime!(2024-01-01 00:00 UTC));

        assert_eq!(delete_expense(expense.id, user_id, NOW, &connection), Ok(()));
        assert_eq!(
            get_expense(expense.id, user_id, &connection),
            Err(Error::NotFound)
        );
        let (expenses, total) =
            list_expenses(&ExpenseQuery::default(), user_id, &connection).unwrap();
        assert!(expenses.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn min_amount_filters_page_and_total() {
        let (connection, user_id) = get_test_db();
        create_test_expense(10.0, user_id, &connection);
        create_test_expense(20.0, user_id, &connection);
        let query = ExpenseQuery {
            min_amount: Some(15.0),
            ..Default::default()
        };

        let (expenses, total) = list_expenses(&query, user_id, &connection).unwrap();

        assert_eq!(amounts(&expenses), [20.0]);
        assert_eq!(total, 1);
    }

    #[test]
    fn amount_range_is_inclusive() {
        let (connection, user_id) = get_test_db();
        for amount in [5.0, 10.0, 15.0, 20.0, 25.0] {
            create_test_expense(amount, user_id, &connection);
        }
        let query = ExpenseQuery {
            min_amount: Some(10.0),
            max_amount: Some(20.0),
            sort: ExpenseSortField::Amount,
            order: SortOrder::Ascending,
            ..Default::default()
        };

        let (expenses, total) = list_expenses(&query, user_id, &connection).unwrap();

        assert_eq!(amounts(&expenses), [10.0, 15.0, 20.0]);
        assert_eq!(total, 3);
    }

    #[test]
    fn time_range_is_inclusive_and_compares_instants() {
        let (connection, user_id) = get_test_db();
        for day in 1..=5 {
            let occurred_at = datetime!(2024-03-01 00:00 UTC) + Duration::days(day - 1);
            create_expense(
                user_id,
                new_expense(day as f64, occurred_at),
                NOW,
                &connection,
            )
            .unwrap();
        }
        let query = ExpenseQuery {
            // 2024-03-02 00:00 UTC
            occurred_from: Some(datetime!(2024-03-02 13:00 +13)),
            occurred_to: Some(datetime!(2024-03-04 00:00 UTC)),
            order: SortOrder::Ascending,
            ..Default::default()
        };

        let (expenses, total) = list_expenses(&query, user_id, &connection).unwrap();

        assert_eq!(amounts(&expenses), [2.0, 3.0, 4.0]);
        assert_eq!(total, 3);
    }

    #[test]
    fn total_is_independent_of_paging() {
        let (connection, user_id) = get_test_db();
        for amount in 1..=7 {
            create_test_expense(amount as f64, user_id, &connection);
        }

        for (limit, offset) in [(1, 0), (3, 3), (20, 0), (5, 10)] {
            let query = ExpenseQuery {
                min_amount: Some(2.0),
                limit,
                offset,
                ..Default::default()
            };

            let (_, total) = list_expenses(&query, user_id, &connection).unwrap();

            assert_eq!(total, 6, "limit {limit} offset {offset}");
        }
    }

    #[test]
    fn pages_do_not_overlap_when_sort_values_tie() {
        let (connection, user_id) = get_test_db();
        let ids: Vec<_> = (0..5)
            .map(|_| create_test_expense(9.99, user_id, &connection).id)
            .collect();

        let mut listed = Vec::new();
        for offset in [0, 2, 4] {
            let query = ExpenseQuery {
                sort: ExpenseSortField::Amount,
                order: SortOrder::Ascending,
                limit: 2,
                offset,
                ..Default::default()
            };
            let (expenses, _) = list_expenses(&query, user_id, &connection).unwrap();
            listed.extend(expenses.into_iter().map(|e| e.id));
        }

        assert_eq!(listed, ids);
    }

    #[test]
    fn default_order_is_occurred_at_descending() {
        let (connection, user_id) = get_test_db();
        create_expense(
            user_id,
            new_expense(1.0, datetime!(2024-01-01 00:00 UTC)),
            NOW,
            &connection,
        )
        .unwrap();
        create_expense(
            user_id,
            new_expense(2.0, datetime!(2024-02-01 00:00 UTC)),
            NOW,
            &connection,
        )
        .unwrap();

        let (expenses, _) = list_expenses(&ExpenseQuery::default(), user_id, &connection).unwrap();

        assert_eq!(amounts(&expenses), [2.0, 1.0]);
    }

    #[test]
    fn search_matches_comment_ignoring_case_and_wildcards() {
        let (connection, user_id) = get_test_db();
        for comment in ["Coffee with Sam", "coffee beans", "100% juice", "tea"] {
            let expense = NewExpense {
                comment: Some(comment.to_owned()),
                ..new_expense(4.0, datetime!(2024-01-01 00:00 UTC))
            };
            create_expense(user_id, expense, NOW, &connection).unwrap();
        }

        let query = ExpenseQuery {
            search: Some("COFFEE".to_owned()),
            ..Default::default()
        };
        let (_, total) = list_expenses(&query, user_id, &connection).unwrap();
        assert_eq!(total, 2);

        let query = ExpenseQuery {
            search: Some("%".to_owned()),
            ..Default::default()
        };
        let (expenses, total) = list_expenses(&query, user_id, &connection).unwrap();
        assert_eq!(total, 1);
        assert_eq!(expenses[0].comment.as_deref(), Some("100% juice"));
    }

    #[test]
    fn search_ignores_case_of_non_ascii_letters() {
        let (connection, user_id) = get_test_db();
        for comment in ["Кофе с Сашей", "КОФЕЙНЫЕ зёрна", "Чай"] {
            let expense = NewExpense {
                comment: Some(comment.to_owned()),
                ..new_expense(4.0, datetime!(2024-01-01 00:00 UTC))
            };
            create_expense(user_id, expense, NOW, &connection).unwrap();
        }

        let query = ExpenseQuery {
            search: Some("кофе".to_owned()),
            ..Default::default()
        };
        let (_, total) = list_expenses(&query, user_id, &connection).unwrap();
        assert_eq!(total, 2);

        let query = ExpenseQuery {
            search: Some("ЗЁРНА".to_owned()),
            ..Default::default()
        };
        let (expenses, total) = list_expenses(&query, user_id, &connection).unwrap();
        assert_eq!(total, 1);
        assert_eq!(expenses[0].comment.as_deref(), Some("КОФЕЙНЫЕ зёрна"));
    }

    #[test]
    fn filters_by_category_and_joins_its_name() {
        let (connection, user_id) = get_test_db();
        let category = create_category(
            user_id,
            CategoryName::new_unchecked("Food"),
            NOW,
            &connection,
        )
        .unwrap();
        create_test_expense(1.0, user_id, &connection);
        let expense = NewExpense {
            category_id: Some(category.id),
            ..new_expense(2.0, datetime!(2024-01-01 00:00 UTC))
        };
        create_expense(user_id, expense, NOW, &connection).unwrap();
        let query = ExpenseQuery {
            category_id: Some(category.id),
            ..Default::default()
        };

        let (expenses, total) = list_expenses(&query, user_id, &connection).unwrap();

        assert_eq!(total, 1);
        assert_eq!(expenses[0].category_id, Some(category.id));
        assert_eq!(expenses[0].category_name.as_deref(), Some("Food"));
    }

    #[test]
    fn deleted_category_leaves_dangling_reference() {
        let (connection, user_id) = get_test_db();
        let category = create_category(
            user_id,
            CategoryName::new_unchecked("Food"),
            NOW,
            &connection,
        )
        .unwrap();
        let expense = create_expense(
            user_id,
            NewExpense {
                category_id: Some(category.id),
                ..new_expense(2.0, datetime!(2024-01-01 00:00 UTC))
            },
            NOW,
            &connection,
        )
        .unwrap();

        delete_category(category.id, user_id, NOW, &connection).unwrap();
        let got = get_expense(expense.id, user_id, &connection).unwrap();

        assert_eq!(got.category_id, Some(category.id));
        assert_eq!(got.category_name, None);
    }

    #[test]
    fn other_users_category_name_is_not_joined() {
        let (connection, user_id) = get_test_db();
        let other_user = create_test_user("other@example.com", &connection);
        let their_category = create_category(
            other_user,
            CategoryName::new_unchecked("Secret"),
            NOW,
            &connection,
        )
        .unwrap();

        let expense = create_expense(
            user_id,
            NewExpense {
                category_id: Some(their_category.id),
                ..new_expense(2.0, datetime!(2024-01-01 00:00 UTC))
            },
            NOW,
            &connection,
        )
        .unwrap();

        assert_eq!(expense.category_name, None);
    }

    #[test]
    fn other_user_gets_not_found() {
        let (connection, user_id) = get_test_db();
        let other_user = create_test_user("other@example.com", &connection);
        let expense = create_test_expense(5.0, user_id, &connection);

        assert_eq!(
            get_expense(expense.id, other_user, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            update_expense(
                expense.id,
                other_user,
                ExpenseUpdate::default(),
                NOW,
                &connection
            ),
            Err(Error::NotFound)
        );
        assert_eq!(
            delete_expense(expense.id, other_user, NOW, &connection),
            Err(Error::NotFound)
        );
        let (expenses, total) =
            list_expenses(&ExpenseQuery::default(), other_user, &connection).unwrap();
        assert!(expenses.is_empty());
        assert_eq!(total, 0);
        assert_eq!(get_expense(expense.id, user_id, &connection), Ok(expense));
    }

    #[test]
    fn update_merges_present_fields() {
        let (connection, user_id) = get_test_db();
        let expense = create_expense(
            user_id,
            NewExpense {
                comment: Some("lunch".to_owned()),
                ..new_expense(12.5, datetime!(2024-01-01 00:00 UTC))
            },
            NOW,
            &connection,
        )
        .unwrap();
        let later = NOW + Duration::hours(1);
        let update = ExpenseUpdate {
            amount: Some(Amount::new_unchecked(15.0)),
            currency: Some(Currency::new_unchecked("NZD")),
            ..Default::default()
        };

        let updated = update_expense(expense.id, user_id, update, later, &connection).unwrap();

        assert_eq!(
            updated,
            Expense {
                amount: Amount::new_unchecked(15.0),
                currency: Currency::new_unchecked("NZD"),
                updated_at: later,
                ..expense
            }
        );
    }

    #[test]
    fn empty_update_only_advances_updated_at() {
        let (connection, user_id) = get_test_db();
        let expense = create_test_expense(12.5, user_id, &connection);
        let later = NOW + Duration::minutes(1);

        let updated = update_expense(
            expense.id,
            user_id,
            ExpenseUpdate::default(),
            later,
            &connection,
        )
        .unwrap();

        assert_eq!(
            updated,
            Expense {
                updated_at: later,
                ..expense
            }
        );
    }

    #[test]
    fn update_deleted_expense_is_not_found() {
        let (connection, user_id) = get_test_db();
        let expense = create_test_expense(12.5, user_id, &connection);
        delete_expense(expense.id, user_id, NOW, &connection).unwrap();

        let result = update_expense(
            expense.id,
            user_id,
            ExpenseUpdate::default(),
            NOW,
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_twice_is_not_found() {
        let (connection, user_id) = get_test_db();
        let expense = create_test_expense(12.5, user_id, &connection);

        assert_eq!(delete_expense(expense.id, user_id, NOW, &connection), Ok(()));
        assert_eq!(
            delete_expense(expense.id, user_id, NOW, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_stamps_deleted_at_and_keeps_row() {
        let (connection, user_id) = get_test_db();
        let expense = create_test_expense(12.5, user_id, &connection);
        let later = NOW + Duration::days(1);

        delete_expense(expense.id, user_id, later, &connection).unwrap();

        let (count, deleted_at, updated_at): (i64, OffsetDateTime, OffsetDateTime) = connection
            .query_row(
                "SELECT COUNT(*), deleted_at, updated_at FROM expense WHERE id = ?1",
                [expense.id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(deleted_at, later);
        assert_eq!(updated_at, later);
    }

    #[test]
    fn amount_check_constraint_rejects_invalid_rows() {
        let (connection, user_id) = get_test_db();

        let result = create_expense(
            user_id,
            new_expense(-1.0, datetime!(2024-01-01 00:00 UTC)),
            NOW,
            &connection,
        );

        assert!(matches!(result, Err(Error::SqlError(_))));
    }
}
