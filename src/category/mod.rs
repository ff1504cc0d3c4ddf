//! Spending categories and the links that assign transactions to them.

mod color;
mod db;
mod domain;
mod endpoints;

pub use color::{FALLBACK_COLOR, color_for_category_name};
pub use db::{
    create_category, create_category_link_table, create_category_table, delete_category,
    delete_category_link, get_categories, get_category, get_or_create_category,
    insert_category_link, update_category,
};
pub use domain::{Category, CategoryName, HexColor, NewCategory};
pub use endpoints::{
    CategoryState, create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
    update_category_endpoint,
};
