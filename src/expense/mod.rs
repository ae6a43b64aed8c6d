//! Expenses: amounts a user spent, optionally filed under a category.

mod core;
mod db;
mod endpoints;

pub use core::{
    Amount, Currency, Expense, ExpenseQuery, ExpenseSortField, ExpenseUpdate, NewExpense,
};
pub use db::{
    create_expense, create_expense_table, delete_expense, get_expense, list_expenses,
    update_expense,
};
pub use endpoints::{
    ExpenseState, create_expense_endpoint, delete_expense_endpoint, get_expense_endpoint,
    list_expenses_endpoint, update_expense_endpoint,
};
