//! Activity log for fitlevel.
//!
//! Every XP-changing operation appends one event to an append-only JSONL
//! file (`$FITLEVEL_HOME/activity.log`). The log is an audit trail; athlete
//! records remain the source of truth.

pub mod log;

pub use log::{ActivityEvent, ActivityEventType, ActivityLog, ACTIVITY_SCHEMA_VERSION};
