//! # Expense Service Module
//!
//! One-off spending entries of the caller. Amounts are stored as cents and
//! expense names are unique per user.

mod delete;
mod get;
mod save;

use actix_web::web::{delete, get, patch, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/expenses";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(get::list))
        .route("", post().to(save::create))
        .route("/{expense_id}", get().to(get::process))
        .route("/{expense_id}", patch().to(save::update))
        .route("/{expense_id}", delete().to(delete::process))
}
