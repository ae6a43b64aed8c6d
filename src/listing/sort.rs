//! Sort field and sort order handling for list queries.

/// The order to sort rows in a list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    #[default]
    Descending,
}

impl SortOrder {
    /// Read the raw `order` query parameter.
    ///
    /// Only "asc" (any case) selects ascending order, anything else,
    /// including a missing value, sorts in descending order.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) if raw.trim().eq_ignore_ascii_case("asc") => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// A column that a list query can be sorted by.
///
/// `Default` gives the field used when the request names no field or an
/// unknown one.
pub trait SortField: Copy + Default {
    /// Match a raw `sort` query parameter to a field.
    fn parse(raw: &str) -> Option<Self>;

    /// The qualified column name to put in the `ORDER BY` clause.
    fn column(&self) -> &'static str;

    /// Read the raw `sort` query parameter, falling back to the default field.
    fn from_query(raw: Option<&str>) -> Self {
        raw.and_then(|raw| Self::parse(raw.trim())).unwrap_or_default()
    }
}

/// Build the `ORDER BY` clause for `field` in `order`.
///
/// Rows with equal sort values are ordered by `id_column` in the same
/// direction so that paging is stable.
pub fn order_by_clause<F: SortField>(field: F, order: SortOrder, id_column: &str) -> String {
    let direction = order.as_sql();

    format!("ORDER BY {} {direction}, {id_column} {direction}", field.column())
}
