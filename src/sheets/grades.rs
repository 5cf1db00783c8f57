//! Grade derivation and the grade-entry sheet.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{require, SheetError};
use crate::models::StudentRecord;

/// Letter grade derived from a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    /// 90+ is A, 80+ B, 70+ C, 60+ D, anything lower F.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            LetterGrade::A
        } else if percentage >= 80.0 {
            LetterGrade::B
        } else if percentage >= 70.0 {
            LetterGrade::C
        } else if percentage >= 60.0 {
            LetterGrade::D
        } else {
            LetterGrade::F
        }
    }

    /// `None` when `max` is not positive.
    pub fn from_score(score: f64, max: f64) -> Option<Self> {
        percentage(score, max).map(Self::from_percentage)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `score / max * 100`, or `None` when `max` is not positive.
pub fn percentage(score: f64, max: f64) -> Option<f64> {
    if max > 0.0 && max.is_finite() && score.is_finite() {
        Some(score / max * 100.0)
    } else {
        None
    }
}

/// One student's row on a grade sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntry {
    pub student_id: i64,
    pub student_name: String,
    pub score: Option<f64>,
    pub grade: Option<LetterGrade>,
}

/// Grades for one assignment, one row per student in the filtered roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSheet {
    pub course: String,
    pub assignment: String,
    pub max_score: f64,
    pub entries: Vec<GradeEntry>,
}

impl GradeSheet {
    pub fn new(
        course: &str,
        assignment: &str,
        max_score: f64,
        roster: &[StudentRecord],
    ) -> Result<Self, SheetError> {
        require("course", course)?;
        require("assignment", assignment)?;
        if percentage(0.0, max_score).is_none() {
            return Err(SheetError::InvalidMaxScore(max_score));
        }
        if roster.is_empty() {
            return Err(SheetError::EmptyRoster);
        }

        let entries = roster
            .iter()
            .map(|student| GradeEntry {
                student_id: student.id,
                student_name: student.full_name(),
                score: None,
                grade: None,
            })
            .collect();

        Ok(Self {
            course: course.trim().to_string(),
            assignment: assignment.trim().to_string(),
            max_score,
            entries,
        })
    }

    /// Record a score and re-derive the student's letter grade.
    pub fn set_score(&mut self, student_id: i64, score: f64) -> Result<LetterGrade, SheetError> {
        if !(0.0..=self.max_score).contains(&score) {
            return Err(SheetError::ScoreOutOfRange {
                score,
                max: self.max_score,
            });
        }
        let max_score = self.max_score;
        let entry = self.entry_mut(student_id)?;
        let grade = LetterGrade::from_score(score, max_score)
            .ok_or(SheetError::InvalidMaxScore(max_score))?;
        entry.score = Some(score);
        entry.grade = Some(grade);
        Ok(grade)
    }

    /// Override the letter grade without touching the score.
    pub fn set_grade(&mut self, student_id: i64, grade: LetterGrade) -> Result<(), SheetError> {
        self.entry_mut(student_id)?.grade = Some(grade);
        Ok(())
    }

    /// Number of graded students per letter.
    pub fn distribution(&self) -> BTreeMap<LetterGrade, usize> {
        let mut counts = BTreeMap::new();
        for grade in self.entries.iter().filter_map(|e| e.grade) {
            *counts.entry(grade).or_insert(0) += 1;
        }
        counts
    }

    /// Mean percentage over scored students.
    pub fn average_percentage(&self) -> Option<f64> {
        let scores: Vec<f64> = self.entries.iter().filter_map(|e| e.score).collect();
        if scores.is_empty() {
            return None;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        percentage(mean, self.max_score)
    }

    fn entry_mut(&mut self, student_id: i64) -> Result<&mut GradeEntry, SheetError> {
        self.entries
            .iter_mut()
            .find(|e| e.student_id == student_id)
            .ok_or(SheetError::UnknownStudent(student_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassSection, YearLevel};

    fn roster() -> Vec<StudentRecord> {
        [(1, "John", "Doe"), (2, "Jane", "Smith"), (3, "Mike", "Johnson")]
            .into_iter()
            .map(|(id, first, last)| StudentRecord {
                id,
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: format!("{}@example.com", first.to_lowercase()),
                enrollment_year: 2023,
                dob: None,
                major: None,
                class_section: ClassSection::A,
                year: YearLevel::First,
                photo: None,
                documents: None,
            })
            .collect()
    }

    #[test]
    fn test_letter_grade_boundaries() {
        assert_eq!(LetterGrade::from_score(85.0, 100.0), Some(LetterGrade::B));
        assert_eq!(LetterGrade::from_percentage(90.0), LetterGrade::A);
        assert_eq!(LetterGrade::from_percentage(89.99), LetterGrade::B);
        assert_eq!(LetterGrade::from_percentage(70.0), LetterGrade::C);
        assert_eq!(LetterGrade::from_percentage(60.0), LetterGrade::D);
        assert_eq!(LetterGrade::from_percentage(59.9), LetterGrade::F);
        assert_eq!(LetterGrade::from_score(45.0, 50.0), Some(LetterGrade::A));
        assert_eq!(LetterGrade::from_score(10.0, 0.0), None);
        assert_eq!(percentage(85.0, 100.0), Some(85.0));
    }

    #[test]
    fn test_sheet_requires_header_and_students() {
        assert_eq!(
            GradeSheet::new(" ", "Quiz 1", 100.0, &roster()).unwrap_err(),
            SheetError::MissingField("course")
        );
        assert_eq!(
            GradeSheet::new("Physics", "Quiz 1", 0.0, &roster()).unwrap_err(),
            SheetError::InvalidMaxScore(0.0)
        );
        assert_eq!(
            GradeSheet::new("Physics", "Quiz 1", 100.0, &[]).unwrap_err(),
            SheetError::EmptyRoster
        );
    }

    #[test]
    fn test_scores_drive_grades_and_distribution() {
        let mut sheet = GradeSheet::new("Physics", "Midterm", 50.0, &roster()).unwrap();
        assert_eq!(sheet.entries[1].student_name, "Jane Smith");

        assert_eq!(sheet.set_score(1, 46.0).unwrap(), LetterGrade::A);
        assert_eq!(sheet.set_score(2, 41.0).unwrap(), LetterGrade::B);
        assert_eq!(sheet.set_score(3, 20.0).unwrap(), LetterGrade::F);
        sheet.set_grade(3, LetterGrade::D).unwrap();

        let distribution = sheet.distribution();
        assert_eq!(distribution.get(&LetterGrade::A), Some(&1));
        assert_eq!(distribution.get(&LetterGrade::D), Some(&1));
        assert_eq!(distribution.get(&LetterGrade::F), None);
        assert_eq!(sheet.entries[2].score, Some(20.0));

        let average = sheet.average_percentage().unwrap();
        assert!((average - 71.33).abs() < 0.01);
        assert!(matches!(
            sheet.set_score(1, 51.0),
            Err(SheetError::ScoreOutOfRange { .. })
        ));
        assert_eq!(
            sheet.set_score(42, 10.0).unwrap_err(),
            SheetError::UnknownStudent(42)
        );
    }
}
