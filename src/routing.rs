//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::{auth_guard, post_log_in, register_user},
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        list_categories_endpoint, update_category_endpoint,
    },
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_expense_endpoint,
        list_expenses_endpoint, update_expense_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in));

    let protected_routes = Router::new()
        .route(
            endpoints::EXPENSES,
            post(create_expense_endpoint).get(list_expenses_endpoint),
        )
        .route(
            endpoints::EXPENSE,
            get(get_expense_endpoint)
                .put(update_expense_endpoint)
                .delete(delete_expense_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            post(create_category_endpoint).get(list_categories_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
