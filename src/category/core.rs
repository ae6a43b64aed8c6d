//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    CategoryId, Error, UserId,
    listing::{SortField, SortOrder},
};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(try_from = "String")]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name from `name` with surrounding whitespace removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl TryFrom<String> for CategoryName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CategoryName::new(&value)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's category for grouping expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The user that owns the category.
    pub user_id: UserId,
    /// The display name, unique per user by convention only.
    pub name: CategoryName,
    /// When the category was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the category was last modified or deleted.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// When the category was soft-deleted. Always `None` for rows returned by reads.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<OffsetDateTime>,
}

/// The fields of a category that an update may change. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryUpdate {
    /// The new name.
    pub name: Option<CategoryName>,
}

/// The columns categories can be listed by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategorySortField {
    /// Sort alphabetically by name.
    #[default]
    Name,
    /// Sort by creation time.
    CreatedAt,
}

impl SortField for CategorySortField {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(CategorySortField::Name),
            "created_at" => Some(CategorySortField::CreatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            CategorySortField::Name => "c.name",
            CategorySortField::CreatedAt => "c.created_at",
        }
    }
}

/// Defines which of a user's categories [list_categories](super::list_categories) returns.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryQuery {
    /// Only include categories whose name contains this text, ignoring ASCII case.
    pub search: Option<String>,
    /// The column to sort by.
    pub sort: CategorySortField,
    /// The direction to sort in.
    pub order: SortOrder,
    /// The maximum number of categories to return.
    pub limit: u64,
    /// The number of matching categories to skip.
    pub offset: u64,
}

impl Default for CategoryQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: CategorySortField::default(),
            order: SortOrder::default(),
            limit: 20,
            offset: 0,
        }
    }
}
