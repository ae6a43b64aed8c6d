//! Categories that group a user's expenses, e.g. 'Groceries' or 'Rent'.

mod core;
mod db;
mod endpoints;

pub use core::{Category, CategoryName, CategoryQuery, CategorySortField, CategoryUpdate};
pub use db::{
    create_category, create_category_table, delete_category, get_category, list_categories,
    update_category,
};
pub use endpoints::{
    CategoryState, create_category_endpoint, delete_category_endpoint, get_category_endpoint,
    list_categories_endpoint, update_category_endpoint,
};
