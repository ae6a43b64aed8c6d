//! Core expense domain types and their validation.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    CategoryId, Error, ExpenseId, UserId,
    listing::{SortField, SortOrder},
};

/// An amount of money spent, always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(f64);

impl Amount {
    /// Create an amount.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if `amount` is zero, negative, NaN or infinite.
    pub fn new(amount: f64) -> Result<Self, Error> {
        if amount.is_finite() && amount > 0.0 {
            Ok(Self(amount))
        } else {
            Err(Error::InvalidAmount(amount))
        }
    }

    /// Create an amount without validation.
    ///
    /// The caller should ensure that `amount` is finite and positive.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(amount: f64) -> Self {
        Self(amount)
    }

    /// The amount as a float.
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for f64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        f64::column_result(value).map(Amount)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A three letter currency code such as "USD", stored in upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a currency code from `code`, ignoring surrounding whitespace and case.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCurrency] unless `code` is exactly three ASCII letters.
    pub fn new(code: &str) -> Result<Self, Error> {
        let trimmed = code.trim();

        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidCurrency(code.to_owned()))
        }
    }

    /// Create a currency code without validation.
    pub fn new_unchecked(code: &str) -> Self {
        Self(code.to_owned())
    }
}

impl TryFrom<String> for Currency {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl AsRef<str> for Currency {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse an RFC 3339 timestamp such as "2024-01-01T00:00:00Z".
///
/// # Errors
///
/// Returns [Error::InvalidTimestamp] with the raw text if it does not parse.
pub(crate) fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map_err(|_| Error::InvalidTimestamp(raw.to_owned()))
}

/// An expense as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// The user that owns the expense.
    pub user_id: UserId,
    /// The category the expense is filed under, if any.
    ///
    /// This may point at a category that has since been deleted.
    pub category_id: Option<CategoryId>,
    /// The name of the category, if it exists, is not deleted and belongs to the same user.
    pub category_name: Option<String>,
    /// How much was spent.
    pub amount: Amount,
    /// The currency of `amount`.
    pub currency: Currency,
    /// When the money was spent.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    /// A free-text note.
    pub comment: Option<String>,
    /// When the expense was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the expense was last modified or deleted.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// When the expense was soft-deleted. Always `None` for rows returned by reads.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<OffsetDateTime>,
}

/// The data needed to record an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// How much was spent.
    pub amount: Amount,
    /// The currency of `amount`.
    pub currency: Currency,
    /// When the money was spent.
    pub occurred_at: OffsetDateTime,
    /// The category to file the expense under.
    pub category_id: Option<CategoryId>,
    /// A free-text note.
    pub comment: Option<String>,
}

/// The fields of an expense that an update may change. `None` keeps the stored value.
///
/// Because `None` means "unchanged", an update cannot clear the category or comment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseUpdate {
    /// The new amount.
    pub amount: Option<Amount>,
    /// The new currency.
    pub currency: Option<Currency>,
    /// The new time the money was spent.
    pub occurred_at: Option<OffsetDateTime>,
    /// The new category.
    pub category_id: Option<CategoryId>,
    /// The new comment.
    pub comment: Option<String>,
}

impl ExpenseUpdate {
    /// Whether the update changes no fields.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// The columns expenses can be listed by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpenseSortField {
    /// Sort by when the money was spent.
    #[default]
    OccurredAt,
    /// Sort by how much was spent.
    Amount,
}

impl SortField for ExpenseSortField {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "occurred_at" => Some(ExpenseSortField::OccurredAt),
            "amount" => Some(ExpenseSortField::Amount),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ExpenseSortField::OccurredAt => "e.occurred_at",
            ExpenseSortField::Amount => "e.amount",
        }
    }
}

/// Defines which of a user's expenses [list_expenses](super::list_expenses) returns.
///
/// Every filter is optional and the ranges are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseQuery {
    /// Only include expenses that occurred at or after this time.
    pub occurred_from: Option<OffsetDateTime>,
    /// Only include expenses that occurred at or before this time.
    pub occurred_to: Option<OffsetDateTime>,
    /// Only include expenses filed under this category.
    pub category_id: Option<CategoryId>,
    /// Only include expenses of at least this amount.
    pub min_amount: Option<f64>,
    /// Only include expenses of at most this amount.
    pub max_amount: Option<f64>,
    /// Only include expenses whose comment contains this text, ignoring ASCII case.
    pub search: Option<String>,
    /// The column to sort by.
    pub sort: ExpenseSortField,
    /// The direction to sort in.
    pub order: SortOrder,
    /// The maximum number of expenses to return.
    pub limit: u64,
    /// The number of matching expenses to skip.
    pub offset: u64,
}

impl Default for ExpenseQuery {
    fn default() -> Self {
        Self {
            occurred_from: None,
            occurred_to: None,
            category_id: None,
            min_amount: None,
            max_amount: None,
            search: None,
            sort: ExpenseSortField::default(),
            order: SortOrder::default(),
            limit: 20,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod amount_tests {
    use crate::{Error, expense::Amount};

    #[test]
    fn new_accepts_positive_amounts() {
        assert_eq!(Amount::new(12.5).map(|a| a.as_f64()), Ok(12.5));
        assert!(Amount::new(0.01).is_ok());
    }

    #[test]
    fn new_rejects_zero_negative_and_non_finite() {
        assert_eq!(Amount::new(0.0), Err(Error::InvalidAmount(0.0)));
        assert_eq!(Amount::new(-3.0), Err(Error::InvalidAmount(-3.0)));
        assert!(Amount::new(f64::INFINITY).is_err());
        assert!(Amount::new(f64::NAN).is_err());
    }

    #[test]
    fn deserialize_validates() {
        let result: Result<Amount, _> = serde_json::from_str("-1");

        assert!(result.is_err());
    }
}

#[cfg(test)]
mod currency_tests {
    use crate::{Error, expense::Currency};

    #[test]
    fn new_uppercases() {
        assert_eq!(Currency::new(" nzd ").unwrap().as_ref(), "NZD");
    }

    #[test]
    fn new_rejects_wrong_length_or_non_letters() {
        for code in ["", "US", "USDT", "U$D", "12 "] {
            assert_eq!(
                Currency::new(code),
                Err(Error::InvalidCurrency(code.to_owned())),
                "code {code:?}"
            );
        }
    }
}
