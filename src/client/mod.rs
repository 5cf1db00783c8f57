//! Remote client for the students collection resource.
//!
//! Every operation is one HTTP round trip. Failures never escape as panics or
//! transport errors; they are folded into [`ApiError`], which carries the message
//! a console view can show as-is.

mod http;

pub use http::*;

use std::fmt;

use async_trait::async_trait;

use crate::models::{StudentFilter, StudentFormData, StudentRecord, StudentUpdate};

/// What went wrong with a call to the collection resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request never completed.
    Transport,
    /// The server answered 404.
    NotFound,
    /// Any other non-success status.
    Rejected { status: u16 },
    /// A success response whose body was not the expected JSON.
    Decode,
}

/// Failure of a single client operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// Server-provided `detail` when present, otherwise a per-operation message.
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ApiErrorKind::NotFound => Some(404),
            ApiErrorKind::Rejected { status } => Some(status),
            ApiErrorKind::Transport | ApiErrorKind::Decode => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

/// Operations against the students collection resource.
#[async_trait]
pub trait StudentsApi: Send + Sync {
    /// `GET /students`, in server order.
    async fn list(&self, filter: &StudentFilter) -> Result<Vec<StudentRecord>, ApiError>;

    /// `GET /students/{id}`.
    async fn get(&self, id: i64) -> Result<StudentRecord, ApiError>;

    /// `POST /students/`. The server assigns the id.
    async fn create(&self, form: &StudentFormData) -> Result<StudentRecord, ApiError>;

    /// `PUT /students/{id}` with a partial or full body.
    async fn update(&self, id: i64, update: &StudentUpdate) -> Result<StudentRecord, ApiError>;

    /// `DELETE /students/{id}`.
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}
