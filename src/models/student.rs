//! Student model matching the console's Student interface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Class section a student is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassSection {
    A,
    B,
    C,
    D,
}

impl ClassSection {
    pub const ALL: [ClassSection; 4] = [
        ClassSection::A,
        ClassSection::B,
        ClassSection::C,
        ClassSection::D,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassSection::A => "A",
            ClassSection::B => "B",
            ClassSection::C => "C",
            ClassSection::D => "D",
        }
    }
}

/// Year level of study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum YearLevel {
    #[serde(rename = "1st Year")]
    First,
    #[serde(rename = "2nd Year")]
    Second,
    #[serde(rename = "3rd Year")]
    Third,
    #[serde(rename = "4th Year")]
    Fourth,
    #[serde(rename = "Graduate")]
    Graduate,
}

impl YearLevel {
    pub const ALL: [YearLevel; 5] = [
        YearLevel::First,
        YearLevel::Second,
        YearLevel::Third,
        YearLevel::Fourth,
        YearLevel::Graduate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            YearLevel::First => "1st Year",
            YearLevel::Second => "2nd Year",
            YearLevel::Third => "3rd Year",
            YearLevel::Fourth => "4th Year",
            YearLevel::Graduate => "Graduate",
        }
    }
}

/// Error returned when a stored or submitted label is not a known section or year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownLabel {}

impl FromStr for ClassSection {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClassSection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownLabel {
                kind: "class section",
                value: s.to_string(),
            })
    }
}

impl FromStr for YearLevel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        YearLevel::ALL
            .into_iter()
            .find(|y| y.as_str() == s)
            .ok_or_else(|| UnknownLabel {
                kind: "year level",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for ClassSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for YearLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attached to a student record. Payload is base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub data: String,
    /// MIME type
    #[serde(rename = "type")]
    pub media_type: String,
}

/// A student record as returned by the collection resource.
///
/// `id` is assigned by the server and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub enrollment_year: i32,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(rename = "class")]
    pub class_section: ClassSection,
    pub year: YearLevel,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub documents: Option<Vec<Document>>,
}

impl StudentRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Mutable fields accepted when registering a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFormData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub enrollment_year: i32,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(rename = "class")]
    pub class_section: ClassSection,
    pub year: YearLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Document>>,
}

impl StudentFormData {
    /// Copy the mutable fields of an existing record, e.g. to prefill an edit form.
    pub fn from_record(record: &StudentRecord) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            enrollment_year: record.enrollment_year,
            dob: record.dob.clone(),
            major: record.major.clone(),
            class_section: record.class_section,
            year: record.year,
            photo: record.photo.clone(),
            documents: record.documents.clone(),
        }
    }

    /// Required-field presence check run by forms before submission.
    ///
    /// Returns the wire names of the blank fields. Section and year are always
    /// present since they are typed.
    pub fn validate_required(&self) -> Result<(), MissingFields> {
        let missing: Vec<&'static str> = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingFields(missing))
        }
    }
}

/// Required fields left blank on a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFields(pub Vec<&'static str>);

impl fmt::Display for MissingFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Please fill in all required fields: {}",
            self.0.join(", ")
        )
    }
}

impl std::error::Error for MissingFields {}

/// Partial update body for `PUT /students/{id}`.
///
/// An absent field is left unchanged. For nullable fields, `Some(None)` is sent as
/// an explicit `null` and clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_year: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub dob: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub major: Option<Option<String>>,
    #[serde(rename = "class", default, skip_serializing_if = "Option::is_none")]
    pub class_section: Option<ClassSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<YearLevel>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub photo: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub documents: Option<Option<Vec<Document>>>,
}

impl From<StudentFormData> for StudentUpdate {
    /// Full replacement of every mutable field.
    fn from(form: StudentFormData) -> Self {
        Self {
            first_name: Some(form.first_name),
            last_name: Some(form.last_name),
            email: Some(form.email),
            enrollment_year: Some(form.enrollment_year),
            dob: Some(form.dob),
            major: Some(form.major),
            class_section: Some(form.class_section),
            year: Some(form.year),
            photo: Some(form.photo),
            documents: Some(form.documents),
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
