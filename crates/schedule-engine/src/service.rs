//! Event booking workflow: mutations gated by conflict detection.
//!
//! Checks and writes are separate store calls with no lock between them; a
//! concurrent writer can still slip a conflicting booking in after the check.

use tracing::info;

use crate::conflict::{ConflictDetector, ConflictGroup};
use crate::error::{Result, ScheduleError};
use crate::event::{Event, EventId, NewEvent, ParticipantId};
use crate::store::EventStore;
use crate::suggest::{FreeSlotSuggester, SuggestOptions};
use crate::window::TimeWindow;

/// Event CRUD over an injected [`EventStore`].
#[derive(Debug, Clone)]
pub struct EventService<S> {
    store: S,
    suggest: SuggestOptions,
}

impl<S: EventStore> EventService<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, SuggestOptions::default())
    }

    pub fn with_options(store: S, suggest: SuggestOptions) -> Self {
        Self { store, suggest }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn detector(&self) -> ConflictDetector<&S> {
        ConflictDetector::new(&self.store)
    }

    pub fn fetch_one(&self, id: &EventId) -> Result<Event> {
        self.store
            .get_event(id)?
            .ok_or_else(|| ScheduleError::EventNotFound(id.clone()))
    }

    /// Events overlapping `window`, sorted by start.
    pub fn fetch_planning(&self, window: &TimeWindow) -> Result<Vec<Event>> {
        window.ensure_ordered()?;
        Ok(self.store.events_between(window)?)
    }

    pub fn detect_conflicts(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
    ) -> Result<Vec<ConflictGroup>> {
        self.detector().detect_conflicts(window, participants)
    }

    pub fn suggest_for(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
    ) -> Result<Vec<TimeWindow>> {
        self.suggester().suggest_free_slots(window, participants)
    }

    /// [`suggest_for`](Self::suggest_for) with a per-call suggestion limit.
    pub fn suggest_up_to(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
        max_suggestions: usize,
    ) -> Result<Vec<TimeWindow>> {
        self.suggester()
            .suggest_up_to(window, participants, max_suggestions)
    }

    fn suggester(&self) -> FreeSlotSuggester<&S> {
        FreeSlotSuggester::with_options(&self.store, self.suggest.clone())
    }

    /// Create an event unless one of its participants is already booked.
    ///
    /// # Errors
    /// `NoParticipants` for an empty participant list, `Conflicts` carrying the
    /// conflict groups when anyone is busy.
    pub fn create_event(&self, draft: NewEvent) -> Result<Event> {
        if draft.participants.is_empty() {
            return Err(ScheduleError::NoParticipants);
        }
        let conflicts = self
            .detector()
            .detect_conflicts(&draft.window, &draft.participants)?;
        if !conflicts.is_empty() {
            return Err(ScheduleError::Conflicts(conflicts));
        }

        let event = self.store.insert_event(&draft)?;
        info!(
            event = %event.id,
            participants = draft.participants.len(),
            "event created"
        );
        Ok(event)
    }

    /// Replace title, kind and window of an existing event.
    ///
    /// The new window is checked against the bookings of the event's current
    /// participants plus any listed in `draft`, ignoring the event itself. New
    /// participants in `draft` are attached in the same store write, so a
    /// failed write leaves both the event and its attendance untouched.
    pub fn update_event(&self, id: &EventId, draft: NewEvent) -> Result<Event> {
        let existing = self.fetch_one(id)?;
        draft.window.ensure_ordered()?;

        let mut participants = self.store.participants_of(id)?;
        for participant in &draft.participants {
            if !participants.contains(participant) {
                participants.push(participant.clone());
            }
        }
        let conflicts =
            self.detector()
                .detect_conflicts_excluding(&draft.window, &participants, id)?;
        if !conflicts.is_empty() {
            return Err(ScheduleError::Conflicts(conflicts));
        }

        let updated = Event {
            id: existing.id,
            title: draft.title,
            kind: draft.kind,
            start: draft.window.start,
            end: draft.window.end,
        };
        if !self.store.update_event(&updated, &draft.participants)? {
            return Err(ScheduleError::EventNotFound(id.clone()));
        }
        info!(event = %id, "event updated");
        Ok(updated)
    }

    /// Delete an event and its attendance rows, returning the removed event.
    pub fn delete_event(&self, id: &EventId) -> Result<Event> {
        let removed = self
            .store
            .delete_event(id)?
            .ok_or_else(|| ScheduleError::EventNotFound(id.clone()))?;
        info!(event = %id, "event deleted");
        Ok(removed)
    }

    /// Attach participants after checking they are free for the event's window.
    pub fn add_participants(&self, id: &EventId, participants: &[ParticipantId]) -> Result<Event> {
        if participants.is_empty() {
            return Err(ScheduleError::NoParticipants);
        }
        let event = self.fetch_one(id)?;
        let conflicts = self
            .detector()
            .detect_conflicts_excluding(&event.window(), participants, id)?;
        if !conflicts.is_empty() {
            return Err(ScheduleError::Conflicts(conflicts));
        }

        self.store.add_participants(id, participants)?;
        info!(event = %id, added = participants.len(), "participants added");
        Ok(event)
    }

    pub fn remove_participants(
        &self,
        id: &EventId,
        participants: &[ParticipantId],
    ) -> Result<Event> {
        if participants.is_empty() {
            return Err(ScheduleError::NoParticipants);
        }
        let event = self.fetch_one(id)?;
        self.store.remove_participants(id, participants)?;
        info!(event = %id, removed = participants.len(), "participants removed");
        Ok(event)
    }
}
