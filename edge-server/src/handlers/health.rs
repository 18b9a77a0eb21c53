//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    catalog_version: String,
    catalog_origin: String,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let catalog = state.shield.catalog().current();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        catalog_version: catalog.version().to_string(),
        catalog_origin: catalog.origin().to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
