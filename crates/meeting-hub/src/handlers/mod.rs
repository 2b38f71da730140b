//! HTTP request handlers for the Meeting Hub.

pub mod health;
pub mod meetings;
pub mod metrics;
pub mod ws;

pub use health::health_check;
pub use meetings::create_meeting;
pub use metrics::metrics_handler;
pub use ws::join_meeting;
