//! Actor model implementation for the Meeting Hub.
//!
//! ```text
//! HubRegistry (process-wide, owns the root CancellationToken)
//! └── HubActor (one per meeting, child token)
//!     ├── owns the client set and moderator slot
//!     └── fans out to N clients
//!         └── connection proxy (inbound + outbound task per WebSocket)
//! ```
//!
//! # Key Design Decisions
//!
//! - **One mailbox per hub**: register, unregister, broadcast and submit share a
//!   single FIFO channel, so their relative order is arrival order
//! - **No locks on hub state**: only the hub task touches clients and moderator
//! - **Drop slow consumers**: a full outbound queue removes the client inline
//! - **Earliest-registered survivor** takes over as moderator
//!
//! # Modules
//!
//! - [`registry`] - `HubRegistry` mapping meeting ids to hubs
//! - [`hub`] - `HubActor` per meeting
//! - [`client`] - Connection proxy tasks for one WebSocket
//! - [`messages`] - Message types for hub communication

pub mod client;
pub mod hub;
pub mod messages;
pub mod registry;

pub use client::{serve_connection, ConnectionSettings};
pub use hub::{HubActor, HubHandle};
pub use messages::*;
pub use registry::HubRegistry;
