//! Mock meeting store.
//!
//! Records every call so tests can assert which meetings were created and
//! deleted, and can be switched to fail every operation.

use meeting_hub::errors::HubError;
use meeting_hub::store::MeetingStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock meeting store for tests.
#[derive(Debug, Default)]
pub struct MockMeetingStore {
    created: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    return_error: AtomicBool,
}

impl MockMeetingStore {
    /// Create a mock that always succeeds.
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Create a mock whose every operation fails.
    pub fn failing() -> Self {
        let store = Self::default();
        store.return_error.store(true, Ordering::SeqCst);
        store
    }

    /// Switch failure mode on or off.
    pub fn set_failing(&self, failing: bool) {
        self.return_error.store(failing, Ordering::SeqCst);
    }

    /// Meeting ids successfully created, in call order.
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    /// Meeting ids successfully deleted, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Number of `create_meeting` calls, including failed ones.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete_meeting` calls, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), HubError> {
        if self.return_error.load(Ordering::SeqCst) {
            Err(HubError::Store("Mock store error".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl MeetingStore for MockMeetingStore {
    async fn create_meeting(&self, meeting_id: &str) -> Result<(), HubError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.created.lock().unwrap().push(meeting_id.to_string());
        Ok(())
    }

    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), HubError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.deleted.lock().unwrap().push(meeting_id.to_string());
        Ok(())
    }

    async fn ping(&self) -> Result<(), HubError> {
        self.check()
    }
}
