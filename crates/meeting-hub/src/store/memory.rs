//! In-memory meeting store, used when no database is configured.

use super::MeetingStore;
use crate::errors::HubError;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Meeting records kept in process memory, keyed by meeting id with the
/// creation timestamp as value.
#[derive(Debug, Default)]
pub struct InMemoryMeetingStore {
    meetings: RwLock<HashMap<String, i64>>,
}

impl InMemoryMeetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, meeting_id: &str) -> bool {
        self.meetings.read().await.contains_key(meeting_id)
    }

    pub async fn len(&self) -> usize {
        self.meetings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.meetings.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn create_meeting(&self, meeting_id: &str) -> Result<(), HubError> {
        let mut meetings = self.meetings.write().await;
        if meetings.contains_key(meeting_id) {
            return Err(HubError::Store(format!(
                "meeting {meeting_id} already exists"
            )));
        }
        meetings.insert(meeting_id.to_string(), chrono::Utc::now().timestamp());
        Ok(())
    }

    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), HubError> {
        self.meetings.write().await.remove(meeting_id);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_delete() {
        let store = InMemoryMeetingStore::new();

        store.create_meeting("m-1").await.unwrap();
        store.create_meeting("m-2").await.unwrap();
        assert!(store.contains("m-1").await);
        assert_eq!(store.len().await, 2);

        store.delete_meeting("m-1").await.unwrap();
        assert!(!store.contains("m-1").await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let store = InMemoryMeetingStore::new();
        store.create_meeting("m-1").await.unwrap();

        let result = store.create_meeting("m-1").await;
        assert!(matches!(result, Err(HubError::Store(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_meeting_succeeds() {
        let store = InMemoryMeetingStore::new();
        assert!(store.delete_meeting("missing").await.is_ok());
        assert!(store.is_empty().await);
        assert!(store.ping().await.is_ok());
    }
}
