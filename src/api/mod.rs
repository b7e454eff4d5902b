//! HTTP API
//!
//! Every handler takes [`SharedState`] and returns `Result<_, OnTymError>`;
//! errors render as `{ "error", "details" }` with the status from
//! [`OnTymError::status_code`](crate::OnTymError::status_code).

pub mod assistant;
pub mod auth;
pub mod error;
pub mod posts;
pub mod products;

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};

use crate::state::SharedState;

pub use error::ErrorBody;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

const ENDPOINTS: &[&str] = &[
    "GET /health",
    "POST /api/recommend",
    "POST /api/chat",
    "GET /api/air-quality?lat=&lon=&label=",
    "POST /api/recommendations",
    "GET /api/packaging",
    "POST /auth/register",
    "POST /auth/login",
    "GET /auth/profile/{user_id}",
    "PUT /auth/profile/{user_id}",
    "GET /products",
    "POST /products",
    "GET /products/seller/{seller_id}",
    "GET /products/{id}",
    "PUT /products/{id}",
    "DELETE /products/{id}",
    "GET /posts",
    "POST /posts",
    "GET /posts/{id}",
    "PUT /posts/{id}",
    "DELETE /posts/{id}",
    "POST /posts/{id}/comments",
    "POST /posts/{id}/like",
];

/// All routes, with state applied
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .nest("/api", assistant::router())
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/posts", posts::router())
        .with_state(state)
}

async fn index() -> Json<Value> {
    Json(json!({
        "service": "OnTym Solutions API",
        "version": crate::VERSION,
        "endpoints": ENDPOINTS,
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}
