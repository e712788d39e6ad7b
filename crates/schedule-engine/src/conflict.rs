//! Detect participants that are already booked during a time window.
//!
//! One range query against the store, then an in-memory group-by-participant.
//! Back-to-back bookings ARE conflicts here (see [`overlaps`](crate::window::overlaps)).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::event::{Event, EventId, ParticipantBooking, ParticipantId};
use crate::store::BookingStore;
use crate::window::TimeWindow;

/// A participant paired with the bookings that overlap the queried window.
///
/// Never empty: participants without overlaps are left out of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictGroup {
    pub participant: ParticipantId,
    pub bookings: Vec<Event>,
}

/// Conflict detection over an injected [`BookingStore`].
#[derive(Debug, Clone)]
pub struct ConflictDetector<S> {
    store: S,
}

impl<S: BookingStore> ConflictDetector<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Find, per participant, the existing bookings overlapping `window`.
    ///
    /// Groups follow the order of `participants`. An empty participant list
    /// returns `[]` without touching the store.
    ///
    /// # Errors
    /// `ScheduleError::InvalidWindow` when `window.end < window.start`;
    /// `ScheduleError::Store` when the store query fails.
    pub fn detect_conflicts(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
    ) -> Result<Vec<ConflictGroup>> {
        self.detect(window, participants, None)
    }

    /// Like [`detect_conflicts`](Self::detect_conflicts) but ignores bookings of
    /// `event`, so an event being moved does not collide with itself.
    pub fn detect_conflicts_excluding(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
        event: &EventId,
    ) -> Result<Vec<ConflictGroup>> {
        self.detect(window, participants, Some(event))
    }

    fn detect(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
        exclude: Option<&EventId>,
    ) -> Result<Vec<ConflictGroup>> {
        window.ensure_ordered()?;
        if participants.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = self.store.find_participant_bookings(participants, window)?;
        if let Some(excluded) = exclude {
            rows.retain(|row| &row.event.id != excluded);
        }
        let groups = group_by_participant(participants, rows);

        debug!(
            participants = participants.len(),
            conflicting = groups.len(),
            "conflict check finished"
        );
        Ok(groups)
    }
}

/// Group store rows by participant, emitting one group per entry of
/// `participants` (input order) that has at least one row.
///
/// Rows keep their store order inside a group; duplicates are preserved.
pub fn group_by_participant(
    participants: &[ParticipantId],
    rows: Vec<ParticipantBooking>,
) -> Vec<ConflictGroup> {
    let mut by_participant: HashMap<ParticipantId, Vec<Event>> = HashMap::new();
    for row in rows {
        by_participant
            .entry(row.participant)
            .or_default()
            .push(row.event);
    }

    participants
        .iter()
        .filter_map(|participant| {
            let bookings = by_participant.get(participant)?;
            (!bookings.is_empty()).then(|| ConflictGroup {
                participant: participant.clone(),
                bookings: bookings.clone(),
            })
        })
        .collect()
}
