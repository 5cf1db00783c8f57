//! Database repository for student CRUD operations.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Document, StudentFormData, StudentRecord, StudentUpdate};

const STUDENT_COLUMNS: &str = "id, first_name, last_name, email, enrollment_year, dob, major, class_name, year, photo, documents";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List students ordered by id, optionally restricted by year level and class.
    pub async fn list_students(
        &self,
        year: Option<&str>,
        class_name: Option<&str>,
    ) -> Result<Vec<StudentRecord>, AppError> {
        let sql = format!(
            "SELECT {STUDENT_COLUMNS} FROM students \
             WHERE (?1 IS NULL OR year = ?1) AND (?2 IS NULL OR class_name = ?2) \
             ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(year)
            .bind(class_name)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(student_from_row).collect()
    }

    /// Get a student by ID.
    pub async fn get_student(&self, id: i64) -> Result<Option<StudentRecord>, AppError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(student_from_row).transpose()
    }

    /// Whether another student already uses `email`.
    pub async fn email_taken(&self, email: &str, except_id: Option<i64>) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT id FROM students WHERE email = ? AND (? IS NULL OR id <> ?)")
            .bind(email)
            .bind(except_id)
            .bind(except_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Create a new student. The id is assigned by SQLite.
    pub async fn create_student(&self, form: &StudentFormData) -> Result<StudentRecord, AppError> {
        if self.email_taken(&form.email, None).await? {
            return Err(email_already_registered());
        }

        let documents = non_empty_documents(form.documents.clone());
        let documents_json = documents_to_json(documents.as_deref())?;

        let result = sqlx::query(
            "INSERT INTO students (first_name, last_name, email, enrollment_year, dob, major, class_name, year, photo, documents) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&form.first_name)
        .bind(&form.last_name)
        .bind(&form.email)
        .bind(form.enrollment_year)
        .bind(&form.dob)
        .bind(&form.major)
        .bind(form.class_section.as_str())
        .bind(form.year.as_str())
        .bind(&form.photo)
        .bind(&documents_json)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        let id = result.last_insert_rowid();
        tracing::info!(id, "student created");

        Ok(StudentRecord {
            id,
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            email: form.email.clone(),
            enrollment_year: form.enrollment_year,
            dob: form.dob.clone(),
            major: form.major.clone(),
            class_section: form.class_section,
            year: form.year,
            photo: form.photo.clone(),
            documents,
        })
    }

    /// Apply a partial update. Absent fields keep their stored value.
    pub async fn update_student(
        &self,
        id: i64,
        update: &StudentUpdate,
    ) -> Result<StudentRecord, AppError> {
        let existing = self
            .get_student(id)
            .await?
            .ok_or_else(AppError::student_not_found)?;

        if let Some(email) = &update.email {
            if *email != existing.email && self.email_taken(email, Some(id)).await? {
                return Err(email_already_registered());
            }
        }

        let mut merged = merge_update(existing, update);
        merged.documents = non_empty_documents(merged.documents);
        let documents_json = documents_to_json(merged.documents.as_deref())?;

        let result = sqlx::query(
            "UPDATE students SET first_name = ?, last_name = ?, email = ?, enrollment_year = ?, dob = ?, \
             major = ?, class_name = ?, year = ?, photo = ?, documents = ? WHERE id = ?",
        )
        .bind(&merged.first_name)
        .bind(&merged.last_name)
        .bind(&merged.email)
        .bind(merged.enrollment_year)
        .bind(&merged.dob)
        .bind(&merged.major)
        .bind(merged.class_section.as_str())
        .bind(merged.year.as_str())
        .bind(&merged.photo)
        .bind(&documents_json)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        // Deleted between the read and the write
        if result.rows_affected() == 0 {
            return Err(AppError::student_not_found());
        }

        tracing::info!(id, "student updated");
        Ok(merged)
    }

    /// Delete a student.
    pub async fn delete_student(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::student_not_found());
        }

        tracing::info!(id, "student deleted");
        Ok(())
    }
}

fn merge_update(existing: StudentRecord, update: &StudentUpdate) -> StudentRecord {
    StudentRecord {
        id: existing.id,
        first_name: update.first_name.clone().unwrap_or(existing.first_name),
        last_name: update.last_name.clone().unwrap_or(existing.last_name),
        email: update.email.clone().unwrap_or(existing.email),
        enrollment_year: update.enrollment_year.unwrap_or(existing.enrollment_year),
        dob: update.dob.clone().unwrap_or(existing.dob),
        major: update.major.clone().unwrap_or(existing.major),
        class_section: update.class_section.unwrap_or(existing.class_section),
        year: update.year.unwrap_or(existing.year),
        photo: update.photo.clone().unwrap_or(existing.photo),
        documents: update.documents.clone().unwrap_or(existing.documents),
    }
}

fn email_already_registered() -> AppError {
    AppError::Validation("Email already registered".to_string())
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return email_already_registered();
        }
    }
    AppError::from(err)
}

/// An empty list is stored as NULL, same as no documents.
fn non_empty_documents(documents: Option<Vec<Document>>) -> Option<Vec<Document>> {
    documents.filter(|d| !d.is_empty())
}

fn documents_to_json(documents: Option<&[Document]>) -> Result<Option<String>, AppError> {
    documents
        .map(serde_json::to_string)
        .transpose()
        .map_err(AppError::from)
}

fn student_from_row(row: &SqliteRow) -> Result<StudentRecord, AppError> {
    let class_name: String = row.get("class_name");
    let year: String = row.get("year");
    let documents_json: Option<String> = row.get("documents");

    let documents = documents_json
        .as_deref()
        .map(serde_json::from_str::<Vec<Document>>)
        .transpose()?;

    Ok(StudentRecord {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        enrollment_year: row.get("enrollment_year"),
        dob: row.get("dob"),
        major: row.get("major"),
        class_section: class_name
            .parse()
            .map_err(|e| AppError::Database(format!("Corrupt student row: {}", e)))?,
        year: year
            .parse()
            .map_err(|e| AppError::Database(format!("Corrupt student row: {}", e)))?,
        photo: row.get("photo"),
        documents,
    })
}
