//! # Category Service Module
//!
//! Per-user spending and income categories. Names are stored lowercase and
//! are unique per user.

mod delete;
pub mod get;
pub mod save;

use actix_web::web::{delete, get, patch, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/categories";

/// Categories every new user starts with.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("housing", "Rent, mortgage and home repairs"),
    ("utilities", "Electricity, water, gas and internet"),
    ("groceries", "Food and household supplies"),
    ("transportation", "Fuel, fares and vehicle upkeep"),
    ("healthcare", "Medical care, medicine and insurance"),
    ("insurance", "Life, property and other policies"),
    ("education", "Tuition, courses and books"),
    ("entertainment", "Movies, events and hobbies"),
    ("dining out", "Restaurants, cafes and takeaway"),
    ("clothing", "Clothes, shoes and accessories"),
    ("personal care", "Grooming and wellness"),
    ("savings", "Money set aside for later"),
    ("debt payments", "Loan and credit card repayments"),
    ("gifts and donations", "Presents and charity"),
    ("travel", "Trips, lodging and tickets"),
    ("salary", "Regular employment income"),
];

/// Registered routes:
///
/// *   **`GET /api/categories`**: all categories of the caller.
/// *   **`POST /api/categories`**: create, body `CreateCategoryRequest`.
/// *   **`GET /api/categories/{id}`**: one category.
/// *   **`PATCH /api/categories/{id}`**: partial update.
/// *   **`DELETE /api/categories/{id}`**: refused with `409` while expenses or
///     incomes still use it.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(get::list))
        .route("", post().to(save::create))
        .route("/{category_id}", get().to(get::process))
        .route("/{category_id}", patch().to(save::update))
        .route("/{category_id}", delete().to(delete::process))
}
