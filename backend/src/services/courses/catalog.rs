//! The course → batches mapping consulted by template generation and by
//! row validation.

use crate::error::ApiError;
use common::model::course::{BatchEntry, CourseEntry};
use rusqlite::Connection;

/// Ordered mapping from course name to its batch titles.
///
/// Course names are unique case-insensitively, batch titles are unique within
/// a course, and every course has at least one batch. Insertion order is kept
/// because it is the order offered in the template dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseBatchMap {
    entries: Vec<(String, Vec<String>)>,
}

impl CourseBatchMap {
    pub fn from_entries(entries: impl IntoIterator<Item = CourseEntry>) -> Self {
        let mut map = CourseBatchMap::default();
        for entry in entries {
            map.insert(&entry.course_name, entry.batches.iter().map(|b| b.title.as_str()));
        }
        map
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Vec<&'a str>)>) -> Self {
        let mut map = CourseBatchMap::default();
        for (course, batches) in pairs {
            map.insert(course, batches);
        }
        map
    }

    /// Adds a course. Blank titles are dropped, repeated titles and an
    /// already known course are ignored, and a course left without batches
    /// is not added.
    pub fn insert<'a>(&mut self, course: &str, batches: impl IntoIterator<Item = &'a str>) {
        let course = course.trim();
        if course.is_empty() || self.find(course).is_some() {
            return;
        }
        let batches = unique_titles(batches);
        if batches.is_empty() {
            return;
        }
        self.entries.push((course.to_string(), batches));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(course, batches)| (course.as_str(), batches.as_slice()))
    }

    /// Case-insensitive lookup returning the stored course name and its batches.
    pub fn find(&self, course: &str) -> Option<(&str, &[String])> {
        let course = course.trim();
        self.iter().find(|(name, _)| name.eq_ignore_ascii_case(course))
    }
}

pub(crate) fn unique_titles<'a>(titles: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for title in titles.into_iter().map(str::trim) {
        if !title.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(title)) {
            out.push(title.to_string());
        }
    }
    out
}

/// Source of the course catalog. The map is read once per request and used as
/// an immutable snapshot for the rest of it.
pub trait CourseCatalog {
    fn course_batches(&self) -> Result<CourseBatchMap, ApiError>;
}

pub struct SqliteCourseCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCourseCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        SqliteCourseCatalog { conn }
    }
}

impl CourseCatalog for SqliteCourseCatalog<'_> {
    fn course_batches(&self) -> Result<CourseBatchMap, ApiError> {
        Ok(CourseBatchMap::from_entries(list_courses(self.conn)?))
    }
}

impl CourseCatalog for [CourseEntry] {
    fn course_batches(&self) -> Result<CourseBatchMap, ApiError> {
        Ok(CourseBatchMap::from_entries(self.iter().cloned()))
    }
}

/// All stored courses in catalog order, batches in their saved order.
pub fn list_courses(conn: &Connection) -> Result<Vec<CourseEntry>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT c.name, b.title
         FROM courses c
         LEFT JOIN course_batches b ON b.course_id = c.id
         ORDER BY c.position, c.name, b.position",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
    })?;

    let mut courses: Vec<CourseEntry> = Vec::new();
    for row in rows {
        let (name, title) = row?;
        if courses.last().map(|c| c.course_name != name).unwrap_or(true) {
            courses.push(CourseEntry {
                course_name: name,
                batches: Vec::new(),
            });
        }
        if let (Some(title), Some(course)) = (title, courses.last_mut()) {
            course.batches.push(BatchEntry { title });
        }
    }
    Ok(courses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_normalizes_titles_and_keeps_order() {
        let map = CourseBatchMap::from_pairs([
            ("NodeJS", vec![" Batch 1 ", "batch 1", "", "Batch 2"]),
            ("JavaScript", vec!["Morning"]),
            ("nodejs", vec!["Ignored"]),
            ("Empty", vec!["  "]),
        ]);
        let courses: Vec<_> = map.iter().collect();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].0, "NodeJS");
        assert_eq!(courses[0].1, ["Batch 1".to_string(), "Batch 2".to_string()]);
        assert_eq!(courses[1].0, "JavaScript");
    }

    #[test]
    fn find_is_case_insensitive() {
        let map = CourseBatchMap::from_pairs([("NodeJS", vec!["Batch 1"])]);
        let (name, batches) = map.find(" nodejs ").unwrap();
        assert_eq!(name, "NodeJS");
        assert_eq!(batches.len(), 1);
        assert!(map.find("Rust").is_none());
    }

    #[test]
    fn slice_catalog_builds_the_same_map() {
        let entries = vec![CourseEntry {
            course_name: "Rust".into(),
            batches: vec![BatchEntry { title: "Evening".into() }],
        }];
        let map = entries.as_slice().course_batches().unwrap();
        assert_eq!(map, CourseBatchMap::from_pairs([("Rust", vec!["Evening"])]));
    }
}
