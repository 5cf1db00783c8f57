//! Year/class filter shared by list views and the `list` call.

use serde::{Deserialize, Serialize};

use super::{ClassSection, StudentRecord, YearLevel};

/// Optional year level and class section restriction. Absent means no restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    #[serde(default)]
    pub year: Option<YearLevel>,
    #[serde(default, rename = "class")]
    pub class_section: Option<ClassSection>,
}

impl StudentFilter {
    pub fn new(year: Option<YearLevel>, class_section: Option<ClassSection>) -> Self {
        Self {
            year,
            class_section,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.class_section.is_none()
    }

    pub fn matches(&self, student: &StudentRecord) -> bool {
        if self.year.is_some_and(|y| y != student.year) {
            return false;
        }
        if self
            .class_section
            .is_some_and(|c| c != student.class_section)
        {
            return false;
        }
        true
    }

    /// Filter an already fetched roster, preserving order.
    pub fn apply(&self, students: &[StudentRecord]) -> Vec<StudentRecord> {
        students
            .iter()
            .filter(|s| self.matches(s))
            .cloned()
            .collect()
    }

    /// Query parameters understood by `GET /students`.
    pub fn query_pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = Vec::new();
        if let Some(year) = self.year {
            pairs.push(("year", year.as_str()));
        }
        if let Some(class_section) = self.class_section {
            pairs.push(("class_name", class_section.as_str()));
        }
        pairs
    }
}
