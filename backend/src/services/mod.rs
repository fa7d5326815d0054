pub mod categories;
pub mod courses;
pub mod expenses;
pub mod incomes;
pub mod onboarding;
pub mod profile;
pub mod users;

use actix_web::web;

/// Mounts every API scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(onboarding::configure_routes())
        .service(courses::configure_routes())
        .service(users::configure_routes())
        .service(categories::configure_routes())
        .service(expenses::configure_routes())
        .service(incomes::configure_routes())
        .service(profile::configure_routes());
}
