//! Meeting Hub
//!
//! WebSocket server for real-time meeting coordination.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Open the meeting store (SQLite, or in-memory when `DATABASE_URL` is unset)
//! 4. Create the hub registry and start the reclaimer
//! 5. Serve HTTP/WebSocket until SIGINT or SIGTERM
//!
//! # Shutdown
//!
//! Readiness flips to 503, the root cancellation token stops the reclaimer and
//! every hub (closing all client connections), then axum drains in-flight
//! requests.

use std::net::SocketAddr;
use std::sync::Arc;

use meeting_hub::actors::HubRegistry;
use meeting_hub::config::Config;
use meeting_hub::observability::metrics::init_metrics_recorder;
use meeting_hub::observability::HealthState;
use meeting_hub::routes::{build_routes, AppState};
use meeting_hub::store::{InMemoryMeetingStore, MeetingStore, SqliteMeetingStore};
use meeting_hub::tasks::{start_meeting_reclaimer, ReclaimerConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Meeting Hub");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        persistent_store = config.database_url.is_some(),
        origin_check = !config.disable_origin_check,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    let store: Arc<dyn MeetingStore> = match &config.database_url {
        Some(url) => {
            info!("Opening SQLite meeting store...");
            let store = SqliteMeetingStore::connect(url).await.map_err(|e| {
                error!("Failed to open meeting store: {}", e);
                e
            })?;
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set, using in-memory meeting store");
            Arc::new(InMemoryMeetingStore::new())
        }
    };

    let root_token = CancellationToken::new();
    let registry = HubRegistry::new(store, root_token.child_token());

    let reclaimer = tokio::spawn(start_meeting_reclaimer(
        registry.clone(),
        ReclaimerConfig::from_config(&config),
        root_token.child_token(),
    ));

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let health = Arc::new(HealthState::new());
    let state = Arc::new(AppState::new(registry, config, Arc::clone(&health)));
    let app = build_routes(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    health.set_ready();
    info!("Meeting Hub listening on {}", addr);

    let shutdown_token = root_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            health.set_not_ready();
            shutdown_token.cancel();
        })
        .await?;

    root_token.cancel();
    if let Err(e) = reclaimer.await {
        error!("Reclaimer task failed: {}", e);
    }

    info!("Meeting Hub shutdown complete");

    Ok(())
}

fn init_tracing() {
    let default_level = if std::env::var_os("DEBUG").is_some() {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("meeting_hub={default_level},hub={default_level},tower_http=debug").into()
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
