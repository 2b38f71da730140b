//! Test server harness for E2E testing
//!
//! Provides `TestHubServer` for spawning real Meeting Hub server instances in tests.

use meeting_hub::actors::HubRegistry;
use meeting_hub::config::Config;
use meeting_hub::models::CreateMeetingResponse;
use meeting_hub::observability::HealthState;
use meeting_hub::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mock_store::MockMeetingStore;

/// Test harness for spawning the Meeting Hub server in E2E tests.
///
/// The reclaimer is not started; tests drive sweeps explicitly with
/// `meeting_hub::tasks::run_sweep(server.registry(), grace)`.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestHubServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .get(&format!("{}/health", server.url()))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestHubServer {
    addr: SocketAddr,
    registry: HubRegistry,
    store: Arc<MockMeetingStore>,
    config: Config,
    cancel_token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestHubServer {
    /// Spawn a server with default configuration and an accepting mock store.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(Arc::new(MockMeetingStore::accepting()), HashMap::new()).await
    }

    /// Spawn a server with the given store and extra environment variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        store: Arc<MockMeetingStore>,
        extra_vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string())]);
        vars.extend(extra_vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let cancel_token = CancellationToken::new();
        let registry = HubRegistry::new(store.clone(), cancel_token.child_token());
        let health = Arc::new(HealthState::new());
        health.set_ready();

        let state = Arc::new(AppState::new(registry.clone(), config.clone(), health));

        // Recorder is built but not installed globally, so parallel tests don't collide.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind(&config.bind_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            registry,
            store,
            config,
            cancel_token,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL for joining a meeting.
    pub fn ws_url(&self, meeting_id: &str) -> String {
        format!("ws://{}/?meeting_id={}", self.addr, meeting_id)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The server's hub registry.
    pub fn registry(&self) -> &HubRegistry {
        &self.registry
    }

    /// The mock store backing the registry.
    pub fn store(&self) -> &MockMeetingStore {
        &self.store
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create a meeting over HTTP and return its id.
    pub async fn create_meeting(&self, actions: &[&str]) -> Result<String, anyhow::Error> {
        let response = reqwest::Client::new()
            .post(self.url())
            .json(&serde_json::json!({ "actions": actions }))
            .send()
            .await?
            .error_for_status()?;

        let created: CreateMeetingResponse = response.json().await?;
        Ok(created.meeting_id)
    }
}

impl Drop for TestHubServer {
    fn drop(&mut self) {
        // Stop every hub and abort the HTTP server task so the test's
        // connections close immediately.
        self.cancel_token.cancel();
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_and_serves_health() {
        let server = TestHubServer::spawn().await.unwrap();

        let response = reqwest::get(format!("{}/health", server.url()))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_create_meeting_helper() {
        let server = TestHubServer::spawn().await.unwrap();

        let meeting_id = server.create_meeting(&["next"]).await.unwrap();

        assert!(server.registry().lookup(&meeting_id).await.is_some());
        assert_eq!(server.store().created(), vec![meeting_id]);
    }

    #[tokio::test]
    async fn test_urls() {
        let server = TestHubServer::spawn().await.unwrap();
        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.ws_url("abc").ends_with("/?meeting_id=abc"));
        assert_eq!(server.config().bind_address, "127.0.0.1:0");
    }
}
