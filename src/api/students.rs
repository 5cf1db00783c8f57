//! Student API endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use email_address::EmailAddress;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{StudentFormData, StudentRecord, StudentUpdate};
use crate::AppState;

const MAX_NAME_LEN: usize = 100;
const MAX_MAJOR_LEN: usize = 100;
const ENROLLMENT_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Query parameters for listing students. Empty values mean no restriction.
#[derive(Debug, Default, Deserialize)]
pub struct ListStudentsQuery {
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
}

/// GET /api/students - List students, optionally filtered by year and class.
pub async fn list_students(
    State(state): State<AppState>,
    query: Result<Query<ListStudentsQuery>, QueryRejection>,
) -> Result<Json<Vec<StudentRecord>>, AppError> {
    let Query(query) = query?;
    let year = non_empty(query.year.as_deref());
    let class_name = non_empty(query.class_name.as_deref());
    tracing::debug!(?year, ?class_name, "listing students");

    let students = state.repo.list_students(year, class_name).await?;
    tracing::debug!(count = students.len(), "students listed");
    Ok(Json(students))
}

/// GET /api/students/:id - Get a single student.
pub async fn get_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<StudentRecord>, AppError> {
    let Path(id) = id?;
    state
        .repo
        .get_student(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::student_not_found)
}

/// POST /api/students - Register a new student.
pub async fn create_student(
    State(state): State<AppState>,
    payload: Result<Json<StudentFormData>, JsonRejection>,
) -> Result<(StatusCode, Json<StudentRecord>), AppError> {
    let Json(form) = payload?;
    tracing::debug!(
        email = %form.email,
        class = %form.class_section,
        year = %form.year,
        photo = form.photo.is_some(),
        documents = form.documents.as_ref().map_or(0, Vec::len),
        "creating student"
    );

    let form = validate_form(form)?;
    let student = state.repo.create_student(&form).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/students/:id - Update some or all fields of a student.
pub async fn update_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StudentUpdate>, JsonRejection>,
) -> Result<Json<StudentRecord>, AppError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    tracing::debug!(id, "updating student");

    let update = validate_update(update)?;
    let student = state.repo.update_student(id, &update).await?;
    Ok(Json(student))
}

/// DELETE /api/students/:id - Delete a student.
pub async fn delete_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    state.repo.delete_student(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn validate_form(mut form: StudentFormData) -> Result<StudentFormData, AppError> {
    check_name("First name", &form.first_name)?;
    check_name("Last name", &form.last_name)?;
    check_email(&form.email)?;
    check_enrollment_year(form.enrollment_year)?;
    form.dob = normalize_dob(form.dob)?;
    check_major(form.major.as_deref())?;
    Ok(form)
}

fn validate_update(mut update: StudentUpdate) -> Result<StudentUpdate, AppError> {
    if let Some(first_name) = &update.first_name {
        check_name("First name", first_name)?;
    }
    if let Some(last_name) = &update.last_name {
        check_name("Last name", last_name)?;
    }
    if let Some(email) = &update.email {
        check_email(email)?;
    }
    if let Some(year) = update.enrollment_year {
        check_enrollment_year(year)?;
    }
    if let Some(dob) = update.dob.take() {
        update.dob = Some(normalize_dob(dob)?);
    }
    if let Some(major) = &update.major {
        check_major(major.as_deref())?;
    }
    Ok(update)
}

fn check_name(label: &str, value: &str) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::Validation(format!("{} is required", label)));
    }
    if len > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            label, MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), AppError> {
    if EmailAddress::is_valid(email) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )))
    }
}

fn check_enrollment_year(year: i32) -> Result<(), AppError> {
    if ENROLLMENT_YEARS.contains(&year) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Enrollment year must be between {} and {}",
            ENROLLMENT_YEARS.start(),
            ENROLLMENT_YEARS.end()
        )))
    }
}

fn check_major(major: Option<&str>) -> Result<(), AppError> {
    match major {
        Some(m) if m.chars().count() > MAX_MAJOR_LEN => Err(AppError::Validation(format!(
            "Major must be at most {} characters",
            MAX_MAJOR_LEN
        ))),
        _ => Ok(()),
    }
}

/// Empty dates are stored as null; anything else must be `YYYY-MM-DD`.
fn normalize_dob(dob: Option<String>) -> Result<Option<String>, AppError> {
    match dob.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|date| Some(date.format("%Y-%m-%d").to_string()))
            .map_err(|_| {
                AppError::Validation(format!(
                    "Invalid date of birth '{}', expected YYYY-MM-DD",
                    raw
                ))
            }),
    }
}
