//! HTTP routes for the Meeting Hub.
//!
//! Defines the Axum router and application state.

use crate::actors::{ConnectionSettings, HubRegistry};
use crate::config::Config;
use crate::handlers;
use crate::observability::{readiness_router, HealthState};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live meetings.
    pub registry: HubRegistry,

    /// Service configuration.
    pub config: Config,

    /// Per-connection timing and buffer settings, derived from `config`.
    pub connection: ConnectionSettings,

    /// Readiness flag flipped on startup and shutdown.
    pub health: Arc<HealthState>,
}

impl AppState {
    pub fn new(registry: HubRegistry, config: Config, health: Arc<HealthState>) -> Self {
        let connection = ConnectionSettings::from_config(&config);
        Self {
            registry,
            config,
            connection,
            health,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `POST /` - Create a meeting
/// - `GET /?meeting_id=<id>` - Join a meeting over WebSocket
/// - `/health` - Liveness report
/// - `/ready` - Readiness probe
/// - `/metrics` - Prometheus metrics
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let readiness = readiness_router(Arc::clone(&state.health));

    let meeting_routes = Router::new()
        .route(
            "/",
            get(handlers::join_meeting).post(handlers::create_meeting),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    meeting_routes
        .merge(readiness)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::{CreateMeetingResponse, HealthResponse};
    use crate::store::InMemoryMeetingStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<AppState>) {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        let registry = HubRegistry::new(
            Arc::new(InMemoryMeetingStore::new()),
            CancellationToken::new(),
        );
        let health = Arc::new(HealthState::new());
        health.set_ready();
        let state = Arc::new(AppState::new(registry, config, health));
        let handle = PrometheusBuilder::new().build_recorder().handle();
        (build_routes(Arc::clone(&state), handle), state)
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_create_meeting_returns_id() {
        let (app, state) = test_app();

        let response = app
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"actions":["next"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let created: CreateMeetingResponse = serde_json::from_slice(&body).unwrap();

        let hub = state.registry.lookup(&created.meeting_id).await.unwrap();
        let hub_state = hub.get_state().await.unwrap();
        assert_eq!(hub_state.restricted_actions, vec!["next".to_string()]);
    }

    #[tokio::test]
    async fn test_create_meeting_tolerates_bad_body() {
        let (app, state) = test_app();

        let response = app
            .oneshot(Request::post("/").body(Body::from("not json")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let created: CreateMeetingResponse = serde_json::from_slice(&body).unwrap();
        let hub = state.registry.lookup(&created.meeting_id).await.unwrap();
        assert!(hub.get_state().await.unwrap().restricted_actions.is_empty());
    }

    #[tokio::test]
    async fn test_health_reports_meetings() {
        let (app, state) = test_app();
        state.registry.create(Vec::new()).await;

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["store"], "healthy");
        assert_eq!(json["meetings"], 1);
    }

    #[tokio::test]
    async fn test_ready_follows_health_state() {
        let (app, state) = test_app();

        let response = app
            .clone()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        state.health.set_not_ready();
        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, _state) = test_app();

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_health_response_shape() {
        let json = serde_json::to_value(HealthResponse {
            status: "degraded",
            store: "unhealthy",
            meetings: 0,
        })
        .unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["store"], "unhealthy");
    }
}
