//! Background tasks for the Meeting Hub.
//!
//! # Tasks
//!
//! - `reclaimer` - Retires meetings with no connected clients and drops their stored records

pub mod reclaimer;

pub use reclaimer::{run_sweep, start_meeting_reclaimer, ReclaimerConfig};
