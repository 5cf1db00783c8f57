//! REST API module.
//!
//! Handlers for the students collection resource consumed by the admin console.

mod students;

pub use students::*;

use axum::Json;
use serde::Serialize;

/// Health check body.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// GET /health - Liveness probe.
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus { status: "healthy" })
}
