//! # Hub Test Utilities
//!
//! Shared test utilities for the Meeting Hub service.
//!
//! This crate provides:
//! - Server test harness (`TestHubServer` for E2E tests)
//! - Mock meeting store (`MockMeetingStore`)
//! - WebSocket test client (`WsTestClient`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hub_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestHubServer::spawn().await?;
//!     let meeting_id = server.create_meeting(&["next"]).await?;
//!
//!     let mut alice = WsTestClient::connect(&server.ws_url(&meeting_id)).await?;
//!     let joined = alice.next_message().await?;
//!     assert_eq!(joined["action"], "newuser");
//!     Ok(())
//! }
//! ```

pub mod mock_store;
pub mod server_harness;
pub mod ws_client;

// Re-export commonly used items
pub use mock_store::*;
pub use server_harness::*;
pub use ws_client::*;
