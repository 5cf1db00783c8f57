//! Per-class entry sheets built from a filtered roster.
//!
//! Views filter the roster by year and class, then fill in one row per student:
//! a score for grade entry, a status for attendance, or a checkbox for
//! course enrollment.

mod attendance;
mod enrollment;
mod grades;

pub use attendance::*;
pub use enrollment::*;
pub use grades::*;

use std::fmt;

/// Why a sheet could not be built or edited.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// A required header field was blank.
    MissingField(&'static str),
    /// Max score must be positive.
    InvalidMaxScore(f64),
    /// Score outside `0..=max`.
    ScoreOutOfRange { score: f64, max: f64 },
    /// The filter matched no students.
    EmptyRoster,
    /// The student is not on this sheet.
    UnknownStudent(i64),
    /// Enrollment submitted without a course.
    NoCourseSelected,
    /// Enrollment submitted with nobody selected.
    NoStudentsSelected,
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::MissingField(field) => write!(f, "{} is required", field),
            SheetError::InvalidMaxScore(max) => {
                write!(f, "max score must be greater than zero, got {}", max)
            }
            SheetError::ScoreOutOfRange { score, max } => {
                write!(f, "score {} is outside 0..={}", score, max)
            }
            SheetError::EmptyRoster => f.write_str("no students match the filter; filter students first"),
            SheetError::UnknownStudent(id) => write!(f, "student {} is not on this sheet", id),
            SheetError::NoCourseSelected => f.write_str("Please select a course"),
            SheetError::NoStudentsSelected => f.write_str("Please select at least one student"),
        }
    }
}

impl std::error::Error for SheetError {}

fn require(field: &'static str, value: &str) -> Result<(), SheetError> {
    if value.trim().is_empty() {
        Err(SheetError::MissingField(field))
    } else {
        Ok(())
    }
}
