//! The JSON endpoints for managing a user's categories.

use std::sync::{Arc, Mutex};

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
    AppState, CategoryId, Clock, Error, UserId,
    category::{
        Category, CategoryName, CategoryQuery, CategorySortField, CategoryUpdate, create_category,
        delete_category, get_category, list_categories, update_category,
    },
    db::lock_connection,
    listing::{Page, PageRequest, PaginationConfig, SortField, SortOrder, non_empty},
};

/// The state needed by the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Stamps created, updated and deleted categories.
    pub clock: Arc<dyn Clock>,
    /// The paging defaults for listing categories.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            clock: state.clock.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct NewCategoryBody {
    name: String,
}

/// The request body for updating a category. Missing fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryUpdateBody {
    #[serde(default)]
    name: Option<String>,
}

/// The query parameters for listing categories.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryListParams {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

/// Create a category for the logged in user.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    body: Result<Json<NewCategoryBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let Json(body) = body?;
    let name = CategoryName::new(&body.name)?;

    let connection = lock_connection(&state.db_connection)?;
    let category = create_category(user_id, name, state.clock.now(), &connection)?;

    tracing::debug!("user {user_id} created category {}", category.id);

    Ok((StatusCode::CREATED, Json(category)))
}

/// List one page of the logged in user's categories.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<CategoryListParams>,
) -> Result<Json<Page<Category>>, Error> {
    let page_request = PageRequest::from_query(
        non_empty(&params.page),
        non_empty(&params.limit),
        &state.pagination_config,
    );
    let query = CategoryQuery {
        search: non_empty(&params.search).map(str::to_owned),
        sort: CategorySortField::from_query(non_empty(&params.sort)),
        order: SortOrder::from_query(non_empty(&params.order)),
        limit: page_request.limit,
        offset: page_request.offset(),
    };

    let connection = lock_connection(&state.db_connection)?;
    let (categories, total) = list_categories(&query, user_id, &connection)?;

    Ok(Json(Page::new(categories, total, page_request)))
}

/// Get one of the logged in user's categories.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    category_id: Result<Path<CategoryId>, PathRejection>,
) -> Result<Json<Category>, Error> {
    let Path(category_id) = category_id?;
    let connection = lock_connection(&state.db_connection)?;

    get_category(category_id, user_id, &connection).map(Json)
}

/// Rename one of the logged in user's categories.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    category_id: Result<Path<CategoryId>, PathRejection>,
    body: Result<Json<CategoryUpdateBody>, JsonRejection>,
) -> Result<Json<Category>, Error> {
    let Path(category_id) = category_id?;
    let Json(body) = body?;
    let update = CategoryUpdate {
        name: body.name.as_deref().map(CategoryName::new).transpose()?,
    };

    let connection = lock_connection(&state.db_connection)?;

    update_category(category_id, user_id, update, state.clock.now(), &connection).map(Json)
}

/// Soft-delete one of the logged in user's categories.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    category_id: Result<Path<CategoryId>, PathRejection>,
) -> Result<Json<Value>, Error> {
    let Path(category_id) = category_id?;
    let connection = lock_connection(&state.db_connection)?;
    delete_category(category_id, user_id, state.clock.now(), &connection)?;

    tracing::debug!("user {user_id} deleted category {category_id}");

    Ok(Json(json!({ "status": "success" })))
}
