//! Propose alternative slots when a requested window is taken.
//!
//! The search starts at the slots immediately before and after the request and
//! walks outward, alternating past/future, testing each candidate of the
//! requested duration against bookings fetched once up front.
//!
//! Bookings are fetched for the calendar day(s) of the request, widened by
//! `lookaround_days`. Candidates must lie inside that fetched span, so every
//! suggestion is conflict-free when re-checked with
//! [`ConflictDetector`](crate::conflict::ConflictDetector).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ScheduleError};
use crate::event::ParticipantId;
use crate::store::BookingStore;
use crate::window::{overlaps, TimeWindow};

/// What a cursor does after probing an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPolicy {
    /// Move one duration further out on success and on failure.
    #[default]
    Advance,
    /// Only move on success; a blocked cursor re-tests the same slot on each
    /// of its turns, so that direction makes no further progress.
    Stall,
}

/// Search limits for [`FreeSlotSuggester`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestOptions {
    /// Stop once this many slots are collected.
    pub max_suggestions: usize,
    /// Give up when the backward cursor is at or before the Unix epoch AND the
    /// forward cursor is more than this far past "now".
    pub horizon: Duration,
    /// Extra whole days fetched on each side of the request's day(s).
    pub lookaround_days: u32,
    /// Hard cap on search iterations.
    pub max_iterations: usize,
    pub step: StepPolicy,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        Self {
            max_suggestions: 4,
            horizon: Duration::days(365),
            lookaround_days: 0,
            max_iterations: 100_000,
            step: StepPolicy::Advance,
        }
    }
}

/// Cooperative cancellation for a running slot search.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Free-slot search over an injected [`BookingStore`].
#[derive(Debug, Clone)]
pub struct FreeSlotSuggester<S> {
    store: S,
    options: SuggestOptions,
}

impl<S: BookingStore> FreeSlotSuggester<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, SuggestOptions::default())
    }

    pub fn with_options(store: S, options: SuggestOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &SuggestOptions {
        &self.options
    }

    /// Suggest up to `max_suggestions` windows of the same duration as `window`
    /// where no participant is booked, sorted by start.
    ///
    /// Fewer results (including none) is a normal outcome. A zero-length window
    /// has no slots to offer and yields `[]`.
    ///
    /// # Errors
    /// `InvalidWindow` for an inverted window, `Store` when the single booking
    /// query fails.
    pub fn suggest_free_slots(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
    ) -> Result<Vec<TimeWindow>> {
        self.suggest_free_slots_at(window, participants, Utc::now(), None)
    }

    /// Like [`suggest_free_slots`](Self::suggest_free_slots), but stops after
    /// `max_suggestions` slots instead of the configured limit.
    pub fn suggest_up_to(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
        max_suggestions: usize,
    ) -> Result<Vec<TimeWindow>> {
        self.search(window, participants, max_suggestions, Utc::now(), None)
    }

    /// [`suggest_free_slots`](Self::suggest_free_slots) with an explicit clock
    /// reading and an optional cancellation flag.
    pub fn suggest_free_slots_at(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
        now: DateTime<Utc>,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<TimeWindow>> {
        self.search(
            window,
            participants,
            self.options.max_suggestions,
            now,
            cancel,
        )
    }

    fn search(
        &self,
        window: &TimeWindow,
        participants: &[ParticipantId],
        max_suggestions: usize,
        now: DateTime<Utc>,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<TimeWindow>> {
        window.ensure_ordered()?;
        let duration = window.duration();
        if duration <= Duration::zero() || max_suggestions == 0 {
            return Ok(Vec::new());
        }

        let span = window.day_span(self.options.lookaround_days);
        let mut busy: Vec<TimeWindow> = if participants.is_empty() {
            Vec::new()
        } else {
            self.store
                .find_participant_bookings(participants, &span)?
                .into_iter()
                .map(|row| row.event.window())
                .collect()
        };
        busy.sort_by_key(|w| (w.start, w.end));

        let search = Search {
            span,
            busy: &busy,
            duration,
            latest: now
                .checked_add_signed(self.options.horizon)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let mut slots = search.run(window, max_suggestions, &self.options, cancel)?;
        slots.sort_by_key(|slot| slot.start);

        debug!(
            participants = participants.len(),
            busy = busy.len(),
            found = slots.len(),
            "free-slot search finished"
        );
        Ok(slots)
    }
}

struct Search<'a> {
    span: TimeWindow,
    busy: &'a [TimeWindow],
    duration: Duration,
    latest: DateTime<Utc>,
}

impl Search<'_> {
    fn run(
        &self,
        window: &TimeWindow,
        max_suggestions: usize,
        options: &SuggestOptions,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<TimeWindow>> {
        let mut found = Vec::new();
        let Some(mut before) = window.start.checked_sub_signed(self.duration) else {
            return Ok(found);
        };
        let mut after = window.end;

        let mut i = 0usize;
        while found.len() < max_suggestions {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                return Err(ScheduleError::Cancelled);
            }
            if before.timestamp_millis() <= 0 && after > self.latest {
                break;
            }
            if !self.fits(before) && !self.fits(after) {
                break;
            }
            if i >= options.max_iterations {
                warn!(
                    iterations = i,
                    found = found.len(),
                    "free-slot search hit its iteration cap"
                );
                break;
            }

            let cursor = if i % 2 == 0 { &mut before } else { &mut after };
            let free = self.is_free(*cursor);
            if free {
                found.push(self.slot_at(*cursor));
            }
            if free || options.step == StepPolicy::Advance {
                let next = if i % 2 == 0 {
                    cursor.checked_sub_signed(self.duration)
                } else {
                    cursor.checked_add_signed(self.duration)
                };
                match next {
                    Some(next) => *cursor = next,
                    None => break,
                }
            }
            i += 1;
        }
        Ok(found)
    }

    fn slot_at(&self, start: DateTime<Utc>) -> TimeWindow {
        TimeWindow {
            start,
            end: start + self.duration,
        }
    }

    /// The candidate starting at `start` lies inside the fetched span.
    fn fits(&self, start: DateTime<Utc>) -> bool {
        start >= self.span.start
            && start
                .checked_add_signed(self.duration)
                .is_some_and(|end| end <= self.span.end)
    }

    fn is_free(&self, start: DateTime<Utc>) -> bool {
        if !self.fits(start) {
            return false;
        }
        let candidate = self.slot_at(start);
        !self.busy.iter().any(|b| overlaps(b, &candidate))
    }
}
