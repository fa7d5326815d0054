//! # Income Service Module
//!
//! Income entries of the caller, optionally recurring weekly, monthly or
//! yearly.

mod delete;
pub mod get;
mod save;

use actix_web::web::{delete, get, patch, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/incomes";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(get::list))
        .route("", post().to(save::create))
        .route("/{income_id}", get().to(get::process))
        .route("/{income_id}", patch().to(save::update))
        .route("/{income_id}", delete().to(delete::process))
}
