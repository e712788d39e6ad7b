//! # schedule-engine
//!
//! Double-booking prevention for shared calendars.
//!
//! Given a set of participants and a candidate time window, the engine reports
//! who is already booked and, when someone is, searches outward in time for the
//! nearest windows of the same length where everyone is free. Storage is an
//! injected collaborator ([`store::BookingStore`]); the engine itself only reads.
//!
//! ## Modules
//!
//! - [`window`] — `TimeWindow`, the shared inclusive overlap predicate, timestamp parsing
//! - [`event`] — Event, participant and booking records
//! - [`store`] — Store traits and the in-memory `MemoryStore`
//! - [`conflict`] — Per-participant conflict detection
//! - [`suggest`] — Bidirectional free-slot search
//! - [`service`] — Event mutations gated by conflict checks
//! - [`config`] — TOML configuration
//! - [`error`] — Error types

pub mod config;
pub mod conflict;
pub mod error;
pub mod event;
pub mod service;
pub mod store;
pub mod suggest;
pub mod window;

pub use config::ScheduleConfig;
pub use conflict::{ConflictDetector, ConflictGroup};
pub use error::{ScheduleError, StoreError};
pub use event::{Event, EventId, EventKind, NewEvent, ParticipantBooking, ParticipantId};
pub use service::EventService;
pub use store::{BookingStore, EventStore, MemoryStore};
pub use suggest::{CancelFlag, FreeSlotSuggester, StepPolicy, SuggestOptions};
pub use window::{overlaps, parse_timestamp, TimeWindow};
