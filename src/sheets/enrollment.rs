//! Course enrollment sheet.

use serde::Serialize;

use super::SheetError;
use crate::models::{StudentFilter, StudentRecord};

/// A submitted enrollment: one course and the students picked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub course: String,
    pub student_ids: Vec<i64>,
    pub students: Vec<StudentRecord>,
}

/// Students offered for enrollment, narrowed by year and class, with a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentSheet {
    course: String,
    candidates: Vec<StudentRecord>,
    selected: Vec<i64>,
}

impl EnrollmentSheet {
    /// The course may still be blank here; [`submit`](Self::submit) rejects it.
    pub fn new(course: &str, roster: &[StudentRecord], filter: &StudentFilter) -> Self {
        Self {
            course: course.trim().to_string(),
            candidates: filter.apply(roster),
            selected: Vec::new(),
        }
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn set_course(&mut self, course: &str) {
        self.course = course.trim().to_string();
    }

    pub fn candidates(&self) -> &[StudentRecord] {
        &self.candidates
    }

    /// Selected ids, in the order they were picked.
    pub fn selected(&self) -> &[i64] {
        &self.selected
    }

    pub fn is_selected(&self, student_id: i64) -> bool {
        self.selected.contains(&student_id)
    }

    /// Flip one student's selection. Returns whether they are now selected.
    pub fn toggle(&mut self, student_id: i64) -> Result<bool, SheetError> {
        if !self.candidates.iter().any(|s| s.id == student_id) {
            return Err(SheetError::UnknownStudent(student_id));
        }
        if let Some(pos) = self.selected.iter().position(|&id| id == student_id) {
            self.selected.remove(pos);
            Ok(false)
        } else {
            self.selected.push(student_id);
            Ok(true)
        }
    }

    /// Select every candidate, or clear the selection if all are already selected.
    pub fn select_all(&mut self) {
        if self.selected.len() == self.candidates.len() {
            self.selected.clear();
        } else {
            self.selected = self.candidates.iter().map(|s| s.id).collect();
        }
    }

    pub fn submit(&self) -> Result<Enrollment, SheetError> {
        if self.course.is_empty() {
            return Err(SheetError::NoCourseSelected);
        }
        if self.selected.is_empty() {
            return Err(SheetError::NoStudentsSelected);
        }

        let students: Vec<StudentRecord> = self
            .candidates
            .iter()
            .filter(|s| self.selected.contains(&s.id))
            .cloned()
            .collect();
        tracing::info!(
            course = %self.course,
            count = students.len(),
            "students enrolled"
        );

        Ok(Enrollment {
            course: self.course.clone(),
            student_ids: self.selected.clone(),
            students,
        })
    }
}
