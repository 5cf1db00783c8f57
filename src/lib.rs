//! College records: the students collection resource and the client-side roster store.
//!
//! The server half persists students in SQLite and exposes them under `/api/students`.
//! The client half ([`client`], [`store`]) is what console views use to list and
//! mutate that collection.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod sheets;
pub mod store;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{AllowedOrigins, Config};
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allow_origin(&state.config.allowed_origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/students",
            get(api::list_students).post(api::create_student),
        )
        .route(
            "/students/",
            get(api::list_students).post(api::create_student),
        )
        .route(
            "/students/{id}",
            get(api::get_student)
                .put(api::update_student)
                .delete(api::delete_student),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(api::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn allow_origin(origins: &AllowedOrigins) -> AllowOrigin {
    match origins {
        AllowedOrigins::Any => AllowOrigin::from(Any),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    }
}
