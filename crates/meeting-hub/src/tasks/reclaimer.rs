//! Idle-meeting reclaimer background task.
//!
//! On every tick the reclaimer walks a snapshot of the registry and asks each
//! hub to retire if it is idle. A hub that retires is removed from the
//! registry and its stored record is deleted.
//!
//! The decision is made by the hub itself, inside its control loop, so a
//! client registering concurrently with the sweep either lands before the
//! check (the hub stays) or finds the hub closed.
//!
//! Store failures are logged and never re-insert the hub or stop the sweep.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is triggered, after finishing
//! the sweep in progress.

use crate::actors::HubRegistry;
use crate::config::{Config, DEFAULT_IDLE_GRACE_SECONDS, DEFAULT_RECLAIM_INTERVAL_SECONDS};
use crate::errors::HubError;
use crate::observability::metrics::{record_meeting_reclaimed, record_store_error};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the reclaimer task.
#[derive(Debug, Clone)]
pub struct ReclaimerConfig {
    /// Sweep interval in seconds.
    pub check_interval_seconds: u64,
    /// Minimum age of a never-joined meeting before it can be reclaimed.
    pub idle_grace_seconds: u64,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: DEFAULT_RECLAIM_INTERVAL_SECONDS,
            idle_grace_seconds: DEFAULT_IDLE_GRACE_SECONDS,
        }
    }
}

impl ReclaimerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            check_interval_seconds: config.reclaim_interval_seconds,
            idle_grace_seconds: config.idle_grace_seconds,
        }
    }

    fn grace(&self) -> Duration {
        Duration::from_secs(self.idle_grace_seconds)
    }
}

/// Start the meeting reclaimer.
///
/// Runs until `cancel_token` is cancelled. The first sweep happens one full
/// interval after start.
#[instrument(skip_all, name = "hub.task.reclaimer")]
pub async fn start_meeting_reclaimer(
    registry: HubRegistry,
    config: ReclaimerConfig,
    cancel_token: CancellationToken,
) {
    info!(
        target: "hub.task.reclaimer",
        check_interval_seconds = config.check_interval_seconds,
        idle_grace_seconds = config.idle_grace_seconds,
        "Starting meeting reclaimer"
    );

    let period = Duration::from_secs(config.check_interval_seconds);
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_sweep(&registry, config.grace()).await;
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "hub.task.reclaimer",
                    "Meeting reclaimer received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "hub.task.reclaimer", "Meeting reclaimer stopped");
}

/// Run a single sweep. Returns the number of meetings reclaimed.
pub async fn run_sweep(registry: &HubRegistry, grace: Duration) -> usize {
    let hubs = registry.snapshot().await;
    let inspected = hubs.len();
    let mut reclaimed = 0;

    for hub in hubs {
        let meeting_id = hub.meeting_id().to_string();

        let retired = match hub.retire_if_idle(grace).await {
            Ok(retired) => retired,
            // Already stopped; nothing left to keep it around for.
            Err(HubError::MeetingClosed(_)) => true,
            Err(e) => {
                warn!(
                    target: "hub.task.reclaimer",
                    meeting_id = %meeting_id,
                    error = %e,
                    "Failed to query hub, skipping"
                );
                false
            }
        };

        if !retired {
            continue;
        }

        registry.remove(&meeting_id).await;
        reclaimed += 1;
        record_meeting_reclaimed();

        if let Err(e) = registry.store().delete_meeting(&meeting_id).await {
            record_store_error("delete");
            error!(
                target: "hub.task.reclaimer",
                meeting_id = %meeting_id,
                error = %e,
                "Failed to delete stored meeting"
            );
        }

        debug!(target: "hub.task.reclaimer", meeting_id = %meeting_id, "Meeting reclaimed");
    }

    if reclaimed > 0 {
        info!(
            target: "hub.task.reclaimer",
            inspected,
            reclaimed,
            "Reclaimed idle meetings"
        );
    }

    reclaimed
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actors::messages::ClientRegistration;
    use crate::store::{InMemoryMeetingStore, MeetingStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FailingDeleteStore {
        delete_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MeetingStore for FailingDeleteStore {
        async fn create_meeting(&self, _meeting_id: &str) -> Result<(), HubError> {
            Ok(())
        }

        async fn delete_meeting(&self, _meeting_id: &str) -> Result<(), HubError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            Err(HubError::Store("disk full".to_string()))
        }
    }

    fn registration(id: &str) -> (ClientRegistration, mpsc::Receiver<crate::actors::messages::Payload>) {
        let (tx, rx) = mpsc::channel(8);
        (
            ClientRegistration {
                client_id: id.to_string(),
                outbound: tx,
                close_token: CancellationToken::new(),
            },
            rx,
        )
    }

    #[test]
    fn test_default_config() {
        let config = ReclaimerConfig::default();
        assert_eq!(config.check_interval_seconds, 60);
        assert_eq!(config.idle_grace_seconds, 60);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_empty_meetings() {
        let store = Arc::new(InMemoryMeetingStore::new());
        let registry = HubRegistry::new(store.clone(), CancellationToken::new());

        let occupied = registry.create(Vec::new()).await;
        let (reg, _rx) = registration("client-a");
        occupied.register(reg).await.unwrap();

        let empty = registry.create(Vec::new()).await;

        let reclaimed = run_sweep(&registry, Duration::ZERO).await;

        assert_eq!(reclaimed, 1);
        assert!(registry.lookup(occupied.meeting_id()).await.is_some());
        assert!(registry.lookup(empty.meeting_id()).await.is_none());
        assert!(store.contains(occupied.meeting_id()).await);
        assert!(!store.contains(empty.meeting_id()).await);
    }

    #[tokio::test]
    async fn test_meeting_reclaimed_after_last_client_leaves() {
        let store = Arc::new(InMemoryMeetingStore::new());
        let registry = HubRegistry::new(store.clone(), CancellationToken::new());
        let hub = registry.create(Vec::new()).await;

        let (reg, _rx) = registration("client-a");
        hub.register(reg).await.unwrap();
        hub.unregister("client-a".to_string()).await.unwrap();

        // A meeting that has had a client is not protected by the grace period.
        let reclaimed = run_sweep(&registry, Duration::from_secs(3600)).await;

        assert_eq!(reclaimed, 1);
        assert!(registry.is_empty().await);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_period_protects_new_meeting() {
        let store = Arc::new(InMemoryMeetingStore::new());
        let registry = HubRegistry::new(store, CancellationToken::new());
        let hub = registry.create(Vec::new()).await;
        let grace = Duration::from_secs(60);

        assert_eq!(run_sweep(&registry, grace).await, 0);
        assert!(registry.lookup(hub.meeting_id()).await.is_some());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(run_sweep(&registry, grace).await, 1);
        assert!(registry.lookup(hub.meeting_id()).await.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_abort_sweep() {
        let store = Arc::new(FailingDeleteStore::default());
        let registry = HubRegistry::new(store.clone(), CancellationToken::new());
        registry.create(Vec::new()).await;
        registry.create(Vec::new()).await;
        registry.create(Vec::new()).await;

        let reclaimed = run_sweep(&registry, Duration::ZERO).await;

        assert_eq!(reclaimed, 3);
        assert_eq!(store.delete_calls.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_closed_hub_is_removed() {
        let store = Arc::new(InMemoryMeetingStore::new());
        let registry = HubRegistry::new(store, CancellationToken::new());
        let hub = registry.create(Vec::new()).await;

        hub.cancel();
        while !hub.is_closed() {
            tokio::task::yield_now().await;
        }

        assert_eq!(run_sweep(&registry, Duration::from_secs(3600)).await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_sweeps_on_interval_and_stops_on_cancel() {
        let store = Arc::new(InMemoryMeetingStore::new());
        let registry = HubRegistry::new(store, CancellationToken::new());
        registry.create(Vec::new()).await;

        let cancel_token = CancellationToken::new();
        let config = ReclaimerConfig {
            check_interval_seconds: 5,
            idle_grace_seconds: 0,
        };
        let task = tokio::spawn(start_meeting_reclaimer(
            registry.clone(),
            config,
            cancel_token.clone(),
        ));

        // Nothing happens before the first interval.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(registry.len().await, 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(registry.is_empty().await);

        cancel_token.cancel();
        task.await.unwrap();
    }
}
