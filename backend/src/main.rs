mod amounts;
mod config;
mod db;
mod error;
mod identity;
mod passwords;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::Config;
use crate::db::Database;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer};
use env_logger::Env;
use log::{error, info};
use std::io;

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        error!("configuration error: {e}");
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let database = Database::new(&config.database_path);
    let applied = database.migrate().map_err(|e| {
        error!("migration of {} failed: {e}", database.path().display());
        io::Error::other(e.to_string())
    })?;
    info!(
        "database {} ready ({} migrations applied)",
        database.path().display(),
        applied.len()
    );

    let host = config.host.clone();
    let port = config.port;
    let upload_limit = config.upload_limit_bytes;
    let config = web::Data::new(config);
    let database = web::Data::new(database);

    info!("Server running at http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(
                web::JsonConfig::default()
                    .limit(upload_limit)
                    .error_handler(error::json_error_handler),
            )
            .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
            .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
            .app_data(config.clone())
            .app_data(database.clone())
            .route("/health", web::get().to(health))
            .configure(services::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
