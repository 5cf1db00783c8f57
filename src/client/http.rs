//! Reqwest-backed students client.
//!
//! Owns transport details only: URL building, JSON bodies, and mapping HTTP
//! statuses and `{"detail": ...}` bodies into [`ApiError`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{ApiError, ApiErrorKind, StudentsApi};
use crate::config::{ClientConfig, ConfigError};
use crate::models::{StudentFilter, StudentFormData, StudentRecord, StudentUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::List => "GET /students",
            Operation::Get => "GET /students/{id}",
            Operation::Create => "POST /students/",
            Operation::Update => "PUT /students/{id}",
            Operation::Delete => "DELETE /students/{id}",
        }
    }

    /// Message used when the server gives no usable `detail`.
    fn fallback_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch students",
            Operation::Get => "Failed to fetch student",
            Operation::Create => "Failed to create student",
            Operation::Update => "Failed to update student",
            Operation::Delete => "Failed to delete student",
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Students client that talks to one collection resource.
#[derive(Debug, Clone)]
pub struct HttpStudentsClient {
    client: Client,
    base_url: Url,
}

impl HttpStudentsClient {
    /// Build a client for `base_url` (e.g. `http://localhost:8000/api/`).
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing reqwest client, e.g. one with default headers.
    pub fn with_client(client: Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    /// Build a client from [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.resolve_base_url()?;
        Self::new(base_url).map_err(|e| ConfigError {
            key: "http client",
            message: e.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str, op: Operation) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| {
            tracing::warn!(operation = op.label(), "invalid request URL: {}", e);
            ApiError::new(ApiErrorKind::Transport, op.fallback_message())
        })
    }

    async fn send(&self, request: RequestBuilder, op: Operation) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(operation = op.label(), "request failed: {}", e);
            ApiError::new(ApiErrorKind::Transport, op.fallback_message())
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(operation = op.label(), "failed to read response body: {}", e);
            ApiError::new(ApiErrorKind::Transport, op.fallback_message())
        })?;
        tracing::debug!(operation = op.label(), status = status.as_u16(), "response received");

        if !status.is_success() {
            let error = rejection(status, body.as_ref(), op);
            tracing::warn!(
                operation = op.label(),
                status = status.as_u16(),
                "request rejected: {}",
                error.message
            );
            return Err(error);
        }
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        op: Operation,
    ) -> Result<T, ApiError> {
        let body = self.send(request, op).await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(operation = op.label(), "invalid response JSON: {}", e);
            ApiError::new(ApiErrorKind::Decode, op.fallback_message())
        })
    }
}

fn rejection(status: StatusCode, body: &[u8], op: Operation) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| op.fallback_message().to_string());

    let kind = if status == StatusCode::NOT_FOUND {
        ApiErrorKind::NotFound
    } else {
        ApiErrorKind::Rejected {
            status: status.as_u16(),
        }
    };
    ApiError::new(kind, message)
}

#[async_trait]
impl StudentsApi for HttpStudentsClient {
    async fn list(&self, filter: &StudentFilter) -> Result<Vec<StudentRecord>, ApiError> {
        let op = Operation::List;
        let mut url = self.url("students", op)?;
        let pairs = filter.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        tracing::debug!(
            operation = op.label(),
            %url,
            year = ?filter.year,
            class = ?filter.class_section,
            "sending request"
        );

        let students: Vec<StudentRecord> = self.send_json(self.client.get(url), op).await?;
        tracing::debug!(operation = op.label(), count = students.len(), "students fetched");
        Ok(students)
    }

    async fn get(&self, id: i64) -> Result<StudentRecord, ApiError> {
        let op = Operation::Get;
        let url = self.url(&format!("students/{}", id), op)?;
        tracing::debug!(operation = op.label(), %url, id, "sending request");
        self.send_json(self.client.get(url), op).await
    }

    async fn create(&self, form: &StudentFormData) -> Result<StudentRecord, ApiError> {
        let op = Operation::Create;
        let url = self.url("students/", op)?;
        tracing::debug!(
            operation = op.label(),
            %url,
            email = %form.email,
            photo = form.photo.is_some(),
            documents = form.documents.as_ref().map_or(0, Vec::len),
            "sending request"
        );
        self.send_json(self.client.post(url).json(form), op).await
    }

    async fn update(&self, id: i64, update: &StudentUpdate) -> Result<StudentRecord, ApiError> {
        let op = Operation::Update;
        let url = self.url(&format!("students/{}", id), op)?;
        tracing::debug!(operation = op.label(), %url, id, "sending request");
        self.send_json(self.client.put(url).json(update), op).await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let op = Operation::Delete;
        let url = self.url(&format!("students/{}", id), op)?;
        tracing::debug!(operation = op.label(), %url, id, "sending request");
        self.send(self.client.delete(url), op).await.map(|_| ())
    }
}
