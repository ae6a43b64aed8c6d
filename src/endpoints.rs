//! The API endpoint URIs.
//!
//! Paths with a parameter use axum's brace syntax, e.g. '/expenses/{expense_id}'.

/// Reports that the server is up.
pub const HEALTH: &str = "/health";
/// The route for registering a user.
pub const USERS: &str = "/api/v1/users";
/// The route for logging in.
pub const LOG_IN: &str = "/api/v1/log_in";
/// The route for creating and listing expenses.
pub const EXPENSES: &str = "/api/v1/expenses";
/// The route for reading, updating and deleting one expense.
pub const EXPENSE: &str = "/api/v1/expenses/{expense_id}";
/// The route for creating and listing categories.
pub const CATEGORIES: &str = "/api/v1/categories";
/// The route for reading, updating and deleting one category.
pub const CATEGORY: &str = "/api/v1/categories/{category_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// Assumes the path has exactly one parameter in braces, e.g.
/// `format_endpoint(EXPENSE, 1)` gives "/api/v1/expenses/1". Paths without
/// a parameter are returned unchanged.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    match (endpoint_path.find('{'), endpoint_path.find('}')) {
        (Some(start), Some(end)) if start < end => format!(
            "{}{id}{}",
            &endpoint_path[..start],
            &endpoint_path[end + 1..]
        ),
        _ => endpoint_path.to_owned(),
    }
}

#[cfg(test)]
mod format_endpoint_tests {
    use super::{EXPENSE, EXPENSES, format_endpoint};

    #[test]
    fn replaces_parameter() {
        assert_eq!(format_endpoint(EXPENSE, 12), "/api/v1/expenses/12");
    }

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(format_endpoint(EXPENSES, 12), EXPENSES);
    }
}
