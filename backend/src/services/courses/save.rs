use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::courses::catalog::unique_titles;
use actix_web::{web, HttpResponse};
use common::model::course::{BatchEntry, CourseEntry};
use common::model::response::ApiResponse;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

const MAX_COURSE_NAME_LEN: usize = 100;
const MAX_BATCH_TITLE_LEN: usize = 50;

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    payload: web::Json<CourseEntry>,
) -> Result<HttpResponse, ApiError> {
    let entry = payload.into_inner();
    let saved = db.run(move |conn| save_course(conn, &entry)).await?;
    info!(
        "course {} saved with {} batches by {}",
        saved.course_name,
        saved.batches.len(),
        user.username
    );
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Course saved successfully", saved)))
}

/// Creates the course or replaces the batch list of an existing one
/// (matched case-insensitively by name).
pub fn save_course(conn: &mut Connection, entry: &CourseEntry) -> Result<CourseEntry, ApiError> {
    let name = entry.course_name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidInput("Course name is required".to_string()));
    }
    if name.chars().count() > MAX_COURSE_NAME_LEN {
        return Err(ApiError::InvalidInput(format!(
            "Course name must be at most {MAX_COURSE_NAME_LEN} characters long"
        )));
    }

    // an empty list is stored; the course stays out of the template until it has batches
    let batches = unique_titles(entry.batches.iter().map(|b| b.title.as_str()));
    if let Some(long) = batches.iter().find(|t| t.chars().count() > MAX_BATCH_TITLE_LEN) {
        return Err(ApiError::InvalidInput(format!(
            "Batch title {long:?} must be at most {MAX_BATCH_TITLE_LEN} characters long"
        )));
    }

    let tx = conn.transaction()?;
    let existing: Option<String> = tx
        .query_row(
            "SELECT id FROM courses WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    let course_id = match existing {
        Some(id) => {
            tx.execute("UPDATE courses SET name = ?1 WHERE id = ?2", params![name, id])?;
            id
        }
        None => {
            let id = Uuid::new_v4().to_string();
            let position: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position), -1) + 1 FROM courses",
                [],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO courses (id, name, position) VALUES (?1, ?2, ?3)",
                params![id, name, position],
            )?;
            id
        }
    };

    tx.execute(
        "DELETE FROM course_batches WHERE course_id = ?1",
        params![course_id],
    )?;
    for (position, title) in batches.iter().enumerate() {
        tx.execute(
            "INSERT INTO course_batches (course_id, title, position) VALUES (?1, ?2, ?3)",
            params![course_id, title, position as i64],
        )?;
    }
    tx.commit()?;

    Ok(CourseEntry {
        course_name: name.to_string(),
        batches: batches
            .into_iter()
            .map(|title| BatchEntry { title })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::USER_ID_HEADER;
    use crate::services::courses::catalog::{list_courses, CourseCatalog, SqliteCourseCatalog};
    use crate::test_support::{course, insert_user, temp_database};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::App;

    #[test]
    fn saving_twice_replaces_the_batches() {
        let (_dir, db) = temp_database();
        let mut conn = db.open().unwrap();

        save_course(&mut conn, &course("NodeJS", &["Batch 1", "Batch 2"])).unwrap();
        save_course(&mut conn, &course("Rust", &["Evening"])).unwrap();
        let saved = save_course(&mut conn, &course("nodejs", &["Batch 3", " batch 3 "])).unwrap();
        assert_eq!(saved.batches, vec![BatchEntry { title: "Batch 3".into() }]);

        let courses = list_courses(&conn).unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].course_name, "nodejs");
        assert_eq!(courses[0].batches, vec![BatchEntry { title: "Batch 3".into() }]);
        assert_eq!(courses[1].course_name, "Rust");
    }

    #[test]
    fn a_course_needs_a_name() {
        let (_dir, db) = temp_database();
        let mut conn = db.open().unwrap();

        let err = save_course(&mut conn, &course("  ", &["Batch 1"])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn course_without_batches_is_stored_but_not_offered() {
        let (_dir, db) = temp_database();
        let mut conn = db.open().unwrap();
        save_course(&mut conn, &course("NodeJS", &["Batch 1"])).unwrap();

        let saved = save_course(&mut conn, &course("Planned", &[])).unwrap();
        assert!(saved.batches.is_empty());
        let saved = save_course(&mut conn, &course("Blank", &[" "])).unwrap();
        assert!(saved.batches.is_empty());

        let names: Vec<String> = list_courses(&conn)
            .unwrap()
            .into_iter()
            .map(|c| c.course_name)
            .collect();
        assert_eq!(names, ["NodeJS", "Planned", "Blank"]);

        let map = SqliteCourseCatalog::new(&conn).course_batches().unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.find("Planned").is_none());
    }

    #[actix_web::test]
    async fn saving_requires_a_user() {
        let (_dir, db) = temp_database();
        let admin = insert_user(&db, "admin@example.com", "admin");
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .configure(crate::services::configure),
        )
        .await;
        let body = course("NodeJS", &["Batch 1"]);

        let req = actix_test::TestRequest::post()
            .uri("/api/courses")
            .set_json(&body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::post()
            .uri("/api/courses")
            .insert_header((USER_ID_HEADER, admin))
            .set_json(&body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let saved: ApiResponse<CourseEntry> = actix_test::read_body_json(resp).await;
        assert_eq!(saved.data.unwrap().course_name, "NodeJS");
    }
}
