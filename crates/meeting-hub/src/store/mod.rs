//! Persistence gateway for meeting records.
//!
//! The hub keeps all coordination state in memory; the store only records
//! which meetings exist. Every call is best-effort: callers log failures and
//! carry on, and nothing is retried.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryMeetingStore;
pub use sqlite::SqliteMeetingStore;

use crate::errors::HubError;

/// Trait for meeting record storage.
#[async_trait::async_trait]
pub trait MeetingStore: Send + Sync {
    /// Record a newly created meeting.
    async fn create_meeting(&self, meeting_id: &str) -> Result<(), HubError>;

    /// Drop a meeting's stored state. Deleting an unknown meeting succeeds.
    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), HubError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), HubError> {
        Ok(())
    }
}
