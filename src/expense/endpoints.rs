//! The JSON endpoints for recording and querying a user's expenses.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{
        FromRef, Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, CategoryId, Clock, Error, ExpenseId, UserId,
    db::lock_connection,
    expense::{
        Amount, Currency, Expense, ExpenseQuery, ExpenseSortField, ExpenseUpdate, NewExpense,
        core::parse_timestamp, create_expense, delete_expense, get_expense, list_expenses,
        update_expense,
    },
    listing::{Page, PageRequest, PaginationConfig, SortField, SortOrder, non_empty},
};

/// The state needed by the expense endpoints.
#[derive(Debug, Clone)]
pub struct ExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Stamps created, updated and deleted expenses.
    pub clock: Arc<dyn Clock>,
    /// The paging defaults for listing expenses.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            clock: state.clock.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The request body for recording an expense.
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpenseBody {
    amount: f64,
    currency: String,
    occurred_at: String,
    #[serde(default)]
    category_id: Option<CategoryId>,
    #[serde(default)]
    comment: Option<String>,
}

impl TryFrom<NewExpenseBody> for NewExpense {
    type Error = Error;

    fn try_from(body: NewExpenseBody) -> Result<Self, Self::Error> {
        Ok(NewExpense {
            amount: Amount::new(body.amount)?,
            currency: Currency::new(&body.currency)?,
            occurred_at: parse_timestamp(&body.occurred_at)?,
            category_id: body.category_id,
            comment: body.comment,
        })
    }
}

/// The request body for updating an expense. Missing or null fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseUpdateBody {
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    occurred_at: Option<String>,
    #[serde(default)]
    category_id: Option<CategoryId>,
    #[serde(default)]
    comment: Option<String>,
}

impl TryFrom<ExpenseUpdateBody> for ExpenseUpdate {
    type Error = Error;

    fn try_from(body: ExpenseUpdateBody) -> Result<Self, Self::Error> {
        Ok(ExpenseUpdate {
            amount: body.amount.map(Amount::new).transpose()?,
            currency: body.currency.as_deref().map(Currency::new).transpose()?,
            occurred_at: body.occurred_at.as_deref().map(parse_timestamp).transpose()?,
            category_id: body.category_id,
            comment: body.comment,
        })
    }
}

/// The query parameters for listing expenses.
///
/// Everything is read as text so that empty values can be treated as missing
/// and bad values reported with the parameter name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseListParams {
    page: Option<String>,
    limit: Option<String>,
    from: Option<String>,
    to: Option<String>,
    category_id: Option<String>,
    min: Option<String>,
    max: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

impl ExpenseListParams {
    fn to_query(&self, page_request: PageRequest) -> Result<ExpenseQuery, Error> {
        Ok(ExpenseQuery {
            occurred_from: non_empty(&self.from).map(parse_timestamp).transpose()?,
            occurred_to: non_empty(&self.to).map(parse_timestamp).transpose()?,
            category_id: parse_filter("category_id", &self.category_id)?,
            min_amount: parse_amount_filter("min", &self.min)?,
            max_amount: parse_amount_filter("max", &self.max)?,
            search: non_empty(&self.search).map(str::to_owned),
            sort: ExpenseSortField::from_query(non_empty(&self.sort)),
            order: SortOrder::from_query(non_empty(&self.order)),
            limit: page_request.limit,
            offset: page_request.offset(),
        })
    }
}

fn parse_filter<T: FromStr>(name: &str, raw: &Option<String>) -> Result<Option<T>, Error> {
    non_empty(raw)
        .map(|value| {
            value
                .parse()
                .map_err(|_| Error::InvalidFilter(name.to_owned(), value.to_owned()))
        })
        .transpose()
}

fn parse_amount_filter(name: &str, raw: &Option<String>) -> Result<Option<f64>, Error> {
    match parse_filter::<f64>(name, raw)? {
        Some(amount) if !amount.is_finite() => Err(Error::InvalidFilter(
            name.to_owned(),
            amount.to_string(),
        )),
        amount => Ok(amount),
    }
}

/// Record an expense for the logged in user.
pub async fn create_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserId>,
    body: Result<Json<NewExpenseBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Expense>), Error> {
    let Json(body) = body?;
    let new_expense = NewExpense::try_from(body)?;

    let connection = lock_connection(&state.db_connection)?;
    let expense = create_expense(user_id, new_expense, state.clock.now(), &connection)?;

    tracing::debug!("user {user_id} created expense {}", expense.id);

    Ok((StatusCode::CREATED, Json(expense)))
}

/// List one page of the logged in user's expenses.
///
/// Filter values that cannot be parsed are rejected, while bad paging and
/// sorting values fall back to the defaults.
pub async fn list_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<ExpenseListParams>,
) -> Result<Json<Page<Expense>>, Error> {
    let page_request = PageRequest::from_query(
        non_empty(&params.page),
        non_empty(&params.limit),
        &state.pagination_config,
    );
    let query = params.to_query(page_request)?;

    let connection = lock_connection(&state.db_connection)?;
    let (expenses, total) = list_expenses(&query, user_id, &connection)?;

    Ok(Json(Page::new(expenses, total, page_request)))
}

/// Get one of the logged in user's expenses.
pub async fn get_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserId>,
    expense_id: Result<Path<ExpenseId>, PathRejection>,
) -> Result<Json<Expense>, Error> {
    let Path(expense_id) = expense_id?;
    let connection = lock_connection(&state.db_connection)?;

    get_expense(expense_id, user_id, &connection).map(Json)
}

/// Change some fields of one of the logged in user's expenses.
pub async fn update_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserId>,
    expense_id: Result<Path<ExpenseId>, PathRejection>,
    body: Result<Json<ExpenseUpdateBody>, JsonRejection>,
) -> Result<Json<Expense>, Error> {
    let Path(expense_id) = expense_id?;
    let Json(body) = body?;
    let update = ExpenseUpdate::try_from(body)?;

    if update.is_empty() {
        tracing::debug!("update for expense {expense_id} has no fields");
    }

    let connection = lock_connection(&state.db_connection)?;

    update_expense(expense_id, user_id, update, state.clock.now(), &connection).map(Json)
}

/// Soft-delete one of the logged in user's expenses.
pub async fn delete_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserId>,
    expense_id: Result<Path<ExpenseId>, PathRejection>,
) -> Result<Json<Value>, Error> {
    let Path(expense_id) = expense_id?;
    let connection = lock_connection(&state.db_connection)?;
    delete_expense(expense_id, user_id, state.clock.now(), &connection)?;

    tracing::debug!("user {user_id} deleted expense {expense_id}");

    Ok(Json(json!({ "status": "success" })))
}
