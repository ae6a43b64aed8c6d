//! Builds `WHERE` clauses from optional filters with positional parameters.

use rusqlite::{ParamsFromIter, ToSql, params_from_iter};

use crate::UserId;

/// A conjunction of SQL predicates and the values bound to their placeholders.
///
/// Each value gets the placeholder `?N` where `N` is its position in the
/// value list, so fragments and values always stay in step. Values are never
/// written into the SQL text.
pub struct Predicates {
    fragments: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl Predicates {
    /// Start with the predicates every list query needs: the row belongs to
    /// `user_id` and has not been soft-deleted.
    ///
    /// `table` is the table name or alias used in the query.
    pub fn owned_by(table: &str, user_id: UserId) -> Self {
        let mut predicates = Self {
            fragments: Vec::new(),
            values: Vec::new(),
        };

        predicates.push(user_id.as_i64(), |p| format!("{table}.user_id = {p}"));
        predicates
            .fragments
            .push(format!("{table}.deleted_at IS NULL"));

        predicates
    }

    /// Bind `value` to the next placeholder and add the predicate built by
    /// `fragment`, which receives the placeholder text (e.g. "?3").
    pub fn push<V>(&mut self, value: V, fragment: impl FnOnce(&str) -> String)
    where
        V: ToSql + 'static,
    {
        let placeholder = self.bind(value);
        self.fragments.push(fragment(&placeholder));
    }

    /// Like [Predicates::push], but only when `value` is present.
    pub fn push_some<V>(&mut self, value: Option<V>, fragment: impl FnOnce(&str) -> String)
    where
        V: ToSql + 'static,
    {
        if let Some(value) = value {
            self.push(value, fragment);
        }
    }

    /// The `WHERE` clause joining all predicates with `AND`.
    pub fn where_clause(&self) -> String {
        format!("WHERE {}", self.fragments.join(" AND "))
    }

    /// Bind `limit` and `offset` after all filter values and return the
    /// `LIMIT ... OFFSET ...` clause.
    ///
    /// Call this after running any count query that shares these predicates.
    pub fn paginate(&mut self, limit: u64, offset: u64) -> String {
        let limit = self.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        let offset = self.bind(i64::try_from(offset).unwrap_or(i64::MAX));

        format!("LIMIT {limit} OFFSET {offset}")
    }

    /// The bound values, in placeholder order.
    pub fn params(&self) -> ParamsFromIter<std::slice::Iter<'_, Box<dyn ToSql>>> {
        params_from_iter(self.values.iter())
    }

    fn bind<V>(&mut self, value: V) -> String
    where
        V: ToSql + 'static,
    {
        self.values.push(Box::new(value));
        format!("?{}", self.values.len())
    }
}

/// Escape the `LIKE` wildcards in `search` so that it matches literally.
///
/// The result must be used with `ESCAPE '\'`.
pub fn escape_like(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len());

    for character in search.chars() {
        if matches!(character, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(character);
    }

    escaped
}
