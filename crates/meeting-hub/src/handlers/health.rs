//! Liveness handler.
//!
//! - `/health`: liveness report, always 200 while the process serves requests
//! - `/ready`: served by [`crate::observability::readiness_router`]

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::warn;

/// Handler for GET /health
///
/// Reports store reachability and the number of live meetings. A store
/// failure degrades the report but does not fail the probe: meetings keep
/// working without the store.
#[tracing::instrument(skip_all, name = "hub.health.liveness")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = match state.registry.store().ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            warn!(target: "hub.handlers", error = %e, "Store ping failed");
            "unhealthy"
        }
    };

    Json(HealthResponse {
        status: if store == "healthy" { "healthy" } else { "degraded" },
        store,
        meetings: state.registry.len().await,
    })
}
