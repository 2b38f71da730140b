//! Readiness tracking for the Meeting Hub.
//!
//! - `GET /ready` - 200 while the hub accepts new meetings and connections,
//!   503 before the listener is bound and once shutdown has begun.
//!
//! The liveness report (`GET /health`) needs the registry and store, so it
//! lives with the HTTP handlers.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Readiness flag shared between `main` and the `/ready` endpoint.
#[derive(Debug, Default)]
pub struct HealthState {
    ready: AtomicBool,
}

impl HealthState {
    /// Create a new health state (not ready).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Mark the service as not ready (shutdown in progress).
    pub fn set_not_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Router serving `GET /ready`.
pub fn readiness_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn ready_status(app: Router) -> StatusCode {
        app.oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_not_ready_until_marked() {
        let state = HealthState::new();
        assert!(!state.is_ready());

        state.set_ready();
        assert!(state.is_ready());

        state.set_not_ready();
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_readiness_endpoint_tracks_state() {
        let state = Arc::new(HealthState::new());
        let app = readiness_router(Arc::clone(&state));

        assert_eq!(ready_status(app.clone()).await, StatusCode::SERVICE_UNAVAILABLE);

        state.set_ready();
        assert_eq!(ready_status(app.clone()).await, StatusCode::OK);

        // Shutdown flips it back.
        state.set_not_ready();
        assert_eq!(ready_status(app).await, StatusCode::SERVICE_UNAVAILABLE);
    }
}
