//! Error types for schedule-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::conflict::ConflictGroup;
use crate::event::EventId;

/// Failures reported by a [`BookingStore`](crate::store::BookingStore) implementation.
///
/// The engine never retries or masks these; they surface unchanged inside
/// [`ScheduleError::Store`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query timed out")]
    Timeout,

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid window: end {end} is before start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Slot search cancelled")]
    Cancelled,

    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("No participant ids provided")]
    NoParticipants,

    #[error("{} participant(s) have conflicting bookings", .0.len())]
    Conflicts(Vec<ConflictGroup>),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
