//! Store collaborator interfaces and an in-memory implementation.
//!
//! The engine only reads through [`BookingStore`]. [`EventStore`] adds the
//! write side used by [`EventService`](crate::service::EventService).

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StoreError;
use crate::event::{Event, EventId, NewEvent, ParticipantBooking, ParticipantId};
use crate::window::{overlaps, TimeWindow};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read access to participant bookings.
pub trait BookingStore: Send + Sync {
    /// Every booking of `participants` whose event satisfies
    /// [`overlaps`]`(event, window)`.
    ///
    /// Returns an empty list, not an error, for no participants or no matches.
    /// Duplicate rows are returned as stored.
    fn find_participant_bookings(
        &self,
        participants: &[ParticipantId],
        window: &TimeWindow,
    ) -> StoreResult<Vec<ParticipantBooking>>;
}

/// Full event persistence.
pub trait EventStore: BookingStore {
    fn get_event(&self, id: &EventId) -> StoreResult<Option<Event>>;

    /// Events overlapping `window`, sorted by start.
    fn events_between(&self, window: &TimeWindow) -> StoreResult<Vec<Event>>;

    /// Persist a new event with its participants; the store assigns the id.
    fn insert_event(&self, draft: &NewEvent) -> StoreResult<Event>;

    /// Replace the stored event with the same id and attach `participants`
    /// (skipping ones already attached) as one write. Returns `false`, and
    /// changes nothing, if the event is absent.
    fn update_event(&self, event: &Event, participants: &[ParticipantId]) -> StoreResult<bool>;

    fn delete_event(&self, id: &EventId) -> StoreResult<Option<Event>>;

    /// Attach participants, skipping ones already attached.
    fn add_participants(&self, id: &EventId, participants: &[ParticipantId]) -> StoreResult<()>;

    fn remove_participants(&self, id: &EventId, participants: &[ParticipantId])
        -> StoreResult<()>;

    fn participants_of(&self, id: &EventId) -> StoreResult<Vec<ParticipantId>>;
}

impl<T: BookingStore + ?Sized> BookingStore for &T {
    fn find_participant_bookings(
        &self,
        participants: &[ParticipantId],
        window: &TimeWindow,
    ) -> StoreResult<Vec<ParticipantBooking>> {
        (**self).find_participant_bookings(participants, window)
    }
}

impl<T: BookingStore + ?Sized> BookingStore for Arc<T> {
    fn find_participant_bookings(
        &self,
        participants: &[ParticipantId],
        window: &TimeWindow,
    ) -> StoreResult<Vec<ParticipantBooking>> {
        (**self).find_participant_bookings(participants, window)
    }
}

macro_rules! forward_event_store {
    ($($wrapper:ty),*) => {$(
        impl<T: EventStore + ?Sized> EventStore for $wrapper {
            fn get_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
                (**self).get_event(id)
            }
            fn events_between(&self, window: &TimeWindow) -> StoreResult<Vec<Event>> {
                (**self).events_between(window)
            }
            fn insert_event(&self, draft: &NewEvent) -> StoreResult<Event> {
                (**self).insert_event(draft)
            }
            fn update_event(
                &self,
                event: &Event,
                participants: &[ParticipantId],
            ) -> StoreResult<bool> {
                (**self).update_event(event, participants)
            }
            fn delete_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
                (**self).delete_event(id)
            }
            fn add_participants(
                &self,
                id: &EventId,
                participants: &[ParticipantId],
            ) -> StoreResult<()> {
                (**self).add_participants(id, participants)
            }
            fn remove_participants(
                &self,
                id: &EventId,
                participants: &[ParticipantId],
            ) -> StoreResult<()> {
                (**self).remove_participants(id, participants)
            }
            fn participants_of(&self, id: &EventId) -> StoreResult<Vec<ParticipantId>> {
                (**self).participants_of(id)
            }
        }
    )*};
}

forward_event_store!(&T, Arc<T>);

#[derive(Debug, Default)]
struct Tables {
    events: BTreeMap<EventId, Event>,
    /// Attendance rows in insertion order; may hold duplicates when loaded
    /// from raw booking records.
    attendance: Vec<(ParticipantId, EventId)>,
    next_id: u64,
}

impl Tables {
    fn attach(&mut self, id: &EventId, participants: &[ParticipantId]) {
        for participant in participants {
            let row = (participant.clone(), id.clone());
            if !self.attendance.contains(&row) {
                self.attendance.push(row);
            }
        }
    }
}

/// Thread-safe in-memory [`EventStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from raw booking rows.
    ///
    /// Rows sharing an event id share one event record (the first one seen).
    /// Rows are kept verbatim, so duplicates stay duplicates.
    pub fn from_bookings(bookings: impl IntoIterator<Item = ParticipantBooking>) -> Self {
        let mut tables = Tables::default();
        for booking in bookings {
            let id = booking.event.id.clone();
            tables.attendance.push((booking.participant, id.clone()));
            tables.events.entry(id).or_insert(booking.event);
        }
        tables.next_id = tables.events.len() as u64;
        Self {
            tables: RwLock::new(tables),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl BookingStore for MemoryStore {
    fn find_participant_bookings(
        &self,
        participants: &[ParticipantId],
        window: &TimeWindow,
    ) -> StoreResult<Vec<ParticipantBooking>> {
        if participants.is_empty() {
            return Ok(Vec::new());
        }
        let tables = self.read()?;
        let rows = tables
            .attendance
            .iter()
            .filter(|(participant, _)| participants.contains(participant))
            .filter_map(|(participant, event_id)| {
                let event = tables.events.get(event_id)?;
                overlaps(&event.window(), window).then(|| ParticipantBooking {
                    participant: participant.clone(),
                    event: event.clone(),
                })
            })
            .collect();
        Ok(rows)
    }
}

impl EventStore for MemoryStore {
    fn get_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
        Ok(self.read()?.events.get(id).cloned())
    }

    fn events_between(&self, window: &TimeWindow) -> StoreResult<Vec<Event>> {
        let tables = self.read()?;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| overlaps(&e.window(), window))
            .cloned()
            .collect();
        events.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
        Ok(events)
    }

    fn insert_event(&self, draft: &NewEvent) -> StoreResult<Event> {
        let mut tables = self.write()?;
        // Skip ids already taken by loaded records.
        let id = loop {
            tables.next_id += 1;
            let candidate = EventId(format!("evt-{}", tables.next_id));
            if !tables.events.contains_key(&candidate) {
                break candidate;
            }
        };
        let event = Event {
            id: id.clone(),
            title: draft.title.clone(),
            kind: draft.kind,
            start: draft.window.start,
            end: draft.window.end,
        };
        tables.events.insert(id.clone(), event.clone());
        tables.attach(&id, &draft.participants);
        Ok(event)
    }

    fn update_event(&self, event: &Event, participants: &[ParticipantId]) -> StoreResult<bool> {
        let mut tables = self.write()?;
        match tables.events.get_mut(&event.id) {
            Some(stored) => {
                *stored = event.clone();
                tables.attach(&event.id, participants);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
        let mut tables = self.write()?;
        let removed = tables.events.remove(id);
        if removed.is_some() {
            tables.attendance.retain(|(_, event_id)| event_id != id);
        }
        Ok(removed)
    }

    fn add_participants(&self, id: &EventId, participants: &[ParticipantId]) -> StoreResult<()> {
        self.write()?.attach(id, participants);
        Ok(())
    }

    fn remove_participants(
        &self,
        id: &EventId,
        participants: &[ParticipantId],
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables
            .attendance
            .retain(|(participant, event_id)| event_id != id || !participants.contains(participant));
        Ok(())
    }

    fn participants_of(&self, id: &EventId) -> StoreResult<Vec<ParticipantId>> {
        let tables = self.read()?;
        let mut seen = Vec::new();
        for (participant, event_id) in &tables.attendance {
            if event_id == id && !seen.contains(participant) {
                seen.push(participant.clone());
            }
        }
        Ok(seen)
    }
}
