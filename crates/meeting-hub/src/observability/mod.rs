//! Observability for the Meeting Hub.
//!
//! - [`health`] - readiness state and `/ready` endpoint
//! - [`metrics`] - Prometheus metrics

pub mod health;
pub mod metrics;

pub use health::{readiness_router, HealthState};
