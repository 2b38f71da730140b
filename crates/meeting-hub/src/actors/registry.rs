//! `HubRegistry` - process-wide map from meeting id to hub.
//!
//! The registry is the only structure shared between otherwise unrelated
//! tasks (meeting creation requests and the reclaimer). It owns the root
//! `CancellationToken`; each hub runs under a child token, so cancelling the
//! registry stops every hub.
//!
//! Lookup misses are an expected outcome (unknown or reclaimed meeting) and
//! are returned as `None`, not as an error.

use crate::observability::metrics::{record_meeting_created, record_store_error, set_meetings_active};
use crate::store::MeetingStore;

use super::hub::{HubActor, HubHandle};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Shared registry of live hubs.
#[derive(Clone)]
pub struct HubRegistry {
    hubs: Arc<RwLock<HashMap<String, HubHandle>>>,
    store: Arc<dyn MeetingStore>,
    cancel_token: CancellationToken,
}

impl HubRegistry {
    /// Create an empty registry backed by `store`.
    pub fn new(store: Arc<dyn MeetingStore>, cancel_token: CancellationToken) -> Self {
        Self {
            hubs: Arc::new(RwLock::new(HashMap::new())),
            store,
            cancel_token,
        }
    }

    /// Create a meeting under a fresh id and start its hub.
    ///
    /// The store record is written best-effort: a store failure is logged and
    /// the in-memory hub is still created.
    #[instrument(skip_all, name = "hub.registry.create", fields(restricted = restricted_actions.len()))]
    pub async fn create(&self, restricted_actions: Vec<String>) -> HubHandle {
        let meeting_id = uuid::Uuid::new_v4().to_string();

        if let Err(e) = self.store.create_meeting(&meeting_id).await {
            record_store_error("create");
            warn!(
                target: "hub.registry",
                meeting_id = %meeting_id,
                error = %e,
                "Failed to persist meeting record, continuing in memory"
            );
        }

        let (handle, _task) = HubActor::spawn(
            meeting_id.clone(),
            restricted_actions,
            self.cancel_token.child_token(),
        );

        let active = {
            let mut hubs = self.hubs.write().await;
            hubs.insert(meeting_id.clone(), handle.clone());
            hubs.len()
        };

        record_meeting_created();
        set_meetings_active(active);

        info!(
            target: "hub.registry",
            meeting_id = %meeting_id,
            active_meetings = active,
            "Meeting created"
        );

        handle
    }

    /// Look up a live hub.
    pub async fn lookup(&self, meeting_id: &str) -> Option<HubHandle> {
        let hub = self.hubs.read().await.get(meeting_id).cloned();
        if hub.is_none() {
            debug!(target: "hub.registry", meeting_id = %meeting_id, "Meeting not found");
        }
        hub
    }

    /// Remove a hub from the registry, returning it if it was present.
    pub async fn remove(&self, meeting_id: &str) -> Option<HubHandle> {
        let (removed, active) = {
            let mut hubs = self.hubs.write().await;
            let removed = hubs.remove(meeting_id);
            (removed, hubs.len())
        };

        if removed.is_some() {
            set_meetings_active(active);
            debug!(
                target: "hub.registry",
                meeting_id = %meeting_id,
                active_meetings = active,
                "Meeting removed"
            );
        }
        removed
    }

    /// Point-in-time copy of every registered hub.
    pub async fn snapshot(&self) -> Vec<HubHandle> {
        self.hubs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.hubs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.hubs.read().await.is_empty()
    }

    /// The meeting store used for creation and reclamation.
    pub fn store(&self) -> Arc<dyn MeetingStore> {
        Arc::clone(&self.store)
    }

    /// Stop every hub. Connected clients are dropped and their connections
    /// closed by their outbound tasks.
    pub fn shutdown(&self) {
        info!(target: "hub.registry", "Registry shutting down all hubs");
        self.cancel_token.cancel();
    }
}
