//! The shared policy for list queries: owner scope, soft-delete filtering,
//! dynamic predicates, paging and sorting.
//!
//! Paging and sorting are lenient on purpose. Unparsable or out of range
//! values fall back to the defaults instead of failing the request.

mod page;
mod predicates;
mod sort;

pub use page::{Page, PageRequest, PaginationConfig};
pub use predicates::{Predicates, escape_like};
pub use sort::{SortField, SortOrder, order_by_clause};

/// Treat an empty or whitespace-only query parameter the same as a missing one.
pub fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
