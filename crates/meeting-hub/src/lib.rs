//! Meeting Hub Service Library
//!
//! Real-time coordination for ephemeral meetings: participants connect over
//! WebSocket, share a moderator role and fan actions out to everyone else in
//! the meeting.
//!
//! # Architecture
//!
//! ```text
//! HubRegistry (process-wide)
//! ├── HubActor (one per meeting)
//! │   ├── owns the client set and moderator slot
//! │   └── gates restricted actions to the moderator
//! └── reclaimer task (retires empty meetings)
//! ```
//!
//! Each WebSocket is served by a connection proxy: an inbound task that
//! submits client messages to the hub and an outbound task that writes the
//! hub's broadcasts back, with keepalive pings.
//!
//! # Modules
//!
//! - [`actors`] - Hub actor, registry and connection proxy
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with HTTP status mapping
//! - [`handlers`] - HTTP and WebSocket handlers
//! - [`models`] - Request and response bodies
//! - [`observability`] - Metrics and readiness
//! - [`routes`] - Router and application state
//! - [`store`] - Meeting record persistence
//! - [`tasks`] - Background tasks

pub mod actors;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod routes;
pub mod store;
pub mod tasks;
