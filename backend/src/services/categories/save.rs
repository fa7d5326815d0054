use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::categories::get::find_category;
use crate::services::categories::DEFAULT_CATEGORIES;
use actix_web::{web, HttpResponse};
use common::model::category::Category;
use common::model::response::ApiResponse;
use common::requests::{CreateCategoryRequest, UpdateCategoryRequest};
use log::info;
use rusqlite::{params, Connection};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 200;

pub async fn create(
    user: CurrentUser,
    db: web::Data<Database>,
    payload: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let category = db
        .run(move |conn| create_category(conn, &user.id, &request))
        .await?;
    info!("category {} created", category.id);
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Category created successfully", category)))
}

pub async fn update(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
    payload: web::Json<UpdateCategoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let category_id = path.into_inner();
    let request = payload.into_inner();
    let category = db
        .run(move |conn| update_category(conn, &user.id, &category_id, &request))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Category updated successfully", category)))
}

fn normalize_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
        return Err(ApiError::InvalidInput("Category name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::InvalidInput(format!(
            "Category name must be at most {MAX_NAME_LEN} characters long"
        )));
    }
    Ok(name)
}

fn normalize_description(raw: &str) -> Result<Option<String>, ApiError> {
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::InvalidInput(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters long"
        )));
    }
    Ok(Some(description.to_string()).filter(|d| !d.is_empty()))
}

fn ensure_unique(
    conn: &Connection,
    user_id: &str,
    name: &str,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE user_id = ?1 AND name = ?2 AND id != COALESCE(?3, ''))",
        params![user_id, name, except_id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(ApiError::Conflict(format!("Category {name:?} already exists")));
    }
    Ok(())
}

pub fn create_category(
    conn: &Connection,
    user_id: &str,
    request: &CreateCategoryRequest,
) -> Result<Category, ApiError> {
    let name = normalize_name(&request.name)?;
    let description = match &request.description {
        Some(raw) => normalize_description(raw)?,
        None => None,
    };
    ensure_unique(conn, user_id, &name, None)?;

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO categories (id, user_id, name, description) VALUES (?1, ?2, ?3, ?4)",
        params![id, user_id, name, description],
    )?;
    find_category(conn, user_id, &id)
}

pub fn update_category(
    conn: &Connection,
    user_id: &str,
    id: &str,
    request: &UpdateCategoryRequest,
) -> Result<Category, ApiError> {
    let current = find_category(conn, user_id, id)?;
    let name = match &request.name {
        Some(raw) => normalize_name(raw)?,
        None => current.name,
    };
    let description = match &request.description {
        Some(raw) => normalize_description(raw)?,
        None => current.description,
    };
    ensure_unique(conn, user_id, &name, Some(id))?;

    conn.execute(
        "UPDATE categories SET name = ?1, description = ?2, updated_at = datetime('now')
         WHERE id = ?3 AND user_id = ?4",
        params![name, description, id, user_id],
    )?;
    find_category(conn, user_id, id)
}

/// Gives a new user the default category set.
pub fn seed_default_categories(conn: &Connection, user_id: &str) -> Result<(), ApiError> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO categories (id, user_id, name, description) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (name, description) in DEFAULT_CATEGORIES {
        stmt.execute(params![Uuid::new_v4().to_string(), user_id, name, description])?;
    }
    Ok(())
}
