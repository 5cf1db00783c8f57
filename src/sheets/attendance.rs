//! Attendance-marking sheet.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{require, SheetError};
use crate::models::{ClassSection, StudentRecord, YearLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: i64,
    pub student_name: String,
    pub status: AttendanceStatus,
}

/// Counts per status for one sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceTally {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

impl AttendanceTally {
    pub fn total(&self) -> usize {
        self.present + self.absent + self.late + self.excused
    }

    /// Share of students who attended (present or late), as a percentage.
    pub fn attendance_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some((self.present + self.late) as f64 / total as f64 * 100.0)
    }
}

/// Attendance for one class on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSheet {
    pub date: NaiveDate,
    pub year: YearLevel,
    #[serde(rename = "class")]
    pub class_section: ClassSection,
    pub course: Option<String>,
    pub entries: Vec<AttendanceEntry>,
}

impl AttendanceSheet {
    /// Start a sheet with every student in `roster` marked present.
    ///
    /// `roster` is normally the store's view filtered to `year` and `class_section`;
    /// students from other classes are skipped.
    pub fn new(
        date: NaiveDate,
        year: YearLevel,
        class_section: ClassSection,
        course: Option<&str>,
        roster: &[StudentRecord],
    ) -> Result<Self, SheetError> {
        if let Some(course) = course {
            require("course", course)?;
        }

        let entries: Vec<AttendanceEntry> = roster
            .iter()
            .filter(|s| s.year == year && s.class_section == class_section)
            .map(|s| AttendanceEntry {
                student_id: s.id,
                student_name: s.full_name(),
                status: AttendanceStatus::Present,
            })
            .collect();

        if entries.is_empty() {
            return Err(SheetError::EmptyRoster);
        }

        Ok(Self {
            date,
            year,
            class_section,
            course: course.map(|c| c.trim().to_string()),
            entries,
        })
    }

    pub fn set_status(&mut self, student_id: i64, status: AttendanceStatus) -> Result<(), SheetError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.student_id == student_id)
            .ok_or(SheetError::UnknownStudent(student_id))?;
        entry.status = status;
        Ok(())
    }

    pub fn tally(&self) -> AttendanceTally {
        let mut tally = AttendanceTally::default();
        for entry in &self.entries {
            match entry.status {
                AttendanceStatus::Present => tally.present += 1,
                AttendanceStatus::Absent => tally.absent += 1,
                AttendanceStatus::Late => tally.late += 1,
                AttendanceStatus::Excused => tally.excused += 1,
            }
        }
        tally
    }

    pub fn attendance_rate(&self) -> Option<f64> {
        self.tally().attendance_rate()
    }
}
