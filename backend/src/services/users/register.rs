use crate::db::Database;
use crate::error::ApiError;
use crate::passwords::{check_strength, hash_password};
use crate::services::categories::save::seed_default_categories;
use crate::services::onboarding::validator::{normalize_username, EmailRule, ValidatedRow};
use crate::services::onboarding::{EMAIL, USERNAME};
use crate::services::profile::update::check_name;
use crate::services::users::tokens::{expires_in, new_token, VERIFICATION_TTL_HOURS};
use actix_web::{web, HttpResponse};
use common::model::account::RegisteredUser;
use common::model::onboarding::ImportedUser;
use common::model::response::ApiResponse;
use common::requests::RegisterUserRequest;
use log::info;
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Self-service sign-up. Needs no identity, so the first account of a fresh
/// deployment is created here.
pub async fn process(
    db: web::Data<Database>,
    payload: web::Json<RegisterUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let user = db.run(move |conn| register_user(conn, &request)).await?;
    info!("user {} registered", user.username);
    Ok(HttpResponse::Created().json(ApiResponse::ok(
        "User registered successfully. Please verify your email.",
        user,
    )))
}

/// Registers one user with a hashed password, a verification token and the
/// default categories.
pub fn register_user(
    conn: &mut Connection,
    request: &RegisterUserRequest,
) -> Result<RegisteredUser, ApiError> {
    let first_name = check_name(&request.first_name, "First name")?;
    let last_name = check_name(&request.last_name, "Last name")?;
    let username = normalize_username(&request.username).map_err(ApiError::InvalidInput)?;
    let email = EmailRule::new()?
        .normalize(&request.email, "Email")
        .map_err(ApiError::InvalidInput)?;
    check_strength(&request.password)?;

    let tx = conn.transaction()?;
    let taken = tx
        .prepare("SELECT 1 FROM users WHERE email = ?1 OR username = ?2")?
        .exists(params![email, username])?;
    if taken {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO users (
            id, email, username, first_name, last_name, password_hash,
            verification_token, verification_expires_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            email,
            username,
            first_name,
            last_name,
            hash_password(&request.password)?,
            new_token(),
            expires_in(VERIFICATION_TTL_HOURS),
        ],
    )?;
    seed_default_categories(&tx, &id)?;
    tx.commit()?;

    Ok(RegisteredUser {
        id,
        first_name,
        last_name,
        username,
        email,
    })
}

/// Registers every row in one transaction. If any email or username is
/// already taken nothing is written and the conflicting rows are listed.
pub fn register_bulk(
    conn: &mut Connection,
    rows: &[ValidatedRow],
) -> Result<Vec<ImportedUser>, ApiError> {
    let tx = conn.transaction()?;

    let mut conflicts = Vec::new();
    {
        let mut email_taken = tx.prepare("SELECT 1 FROM users WHERE email = ?1")?;
        let mut username_taken = tx.prepare("SELECT 1 FROM users WHERE username = ?1")?;
        for row in rows {
            if email_taken.exists(params![row.record.email])? {
                conflicts.push(format!("Row {}: {EMAIL} - User already exists", row.row));
            }
            if username_taken.exists(params![row.record.username])? {
                conflicts.push(format!(
                    "Row {}: {USERNAME} - Username is already taken",
                    row.row
                ));
            }
        }
    }
    if !conflicts.is_empty() {
        return Err(ApiError::Conflict(format!(
            "Users already exist: {}",
            conflicts.join("; ")
        )));
    }

    let expires_at = expires_in(VERIFICATION_TTL_HOURS);
    let mut created = Vec::with_capacity(rows.len());
    for row in rows {
        let record = &row.record;
        let id = Uuid::new_v4().to_string();
        let token = new_token();
        tx.execute(
            "INSERT INTO users (
                id, email, username, first_name, last_name, contact, address, gender, dob,
                course, batch, verification_token, verification_expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                record.email,
                record.username,
                record.first_name,
                record.last_name,
                record.contact,
                record.address,
                record.gender.label(),
                record.dob.format("%Y-%m-%d").to_string(),
                record.course,
                record.batch,
                token,
                expires_at,
            ],
        )?;
        seed_default_categories(&tx, &id)?;
        created.push(ImportedUser {
            id,
            email: record.email.clone(),
            username: record.username.clone(),
        });
    }
    tx.commit()?;

    info!("registered {} users", created.len());
    Ok(created)
}
