//! Tests for the bidirectional free-slot search.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use schedule_engine::store::StoreResult;
use schedule_engine::{
    BookingStore, CancelFlag, ConflictDetector, Event, EventKind, FreeSlotSuggester, MemoryStore,
    ParticipantBooking, ParticipantId, ScheduleError, StepPolicy, StoreError, SuggestOptions,
    TimeWindow,
};

fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
}

/// Helper to create a window from hour/minute pairs on 2026-03-16.
fn window(start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> TimeWindow {
    TimeWindow {
        start: at(16, start_hour, start_min),
        end: at(16, end_hour, end_min),
    }
}

fn booking(participant: &str, event_id: &str, w: TimeWindow) -> ParticipantBooking {
    ParticipantBooking {
        participant: participant.into(),
        event: Event {
            id: event_id.into(),
            title: format!("Event {event_id}"),
            kind: EventKind::Personal,
            start: w.start,
            end: w.end,
        },
    }
}

fn ids(names: &[&str]) -> Vec<ParticipantId> {
    names.iter().map(|n| ParticipantId::from(*n)).collect()
}

fn options(max_suggestions: usize, step: StepPolicy) -> SuggestOptions {
    SuggestOptions {
        max_suggestions,
        step,
        ..SuggestOptions::default()
    }
}

/// A fixed "now" at the start of the test day.
fn now() -> DateTime<Utc> {
    at(16, 0, 0)
}

struct CountingStore {
    inner: MemoryStore,
    queries: AtomicUsize,
}

impl BookingStore for CountingStore {
    fn find_participant_bookings(
        &self,
        participants: &[ParticipantId],
        window: &TimeWindow,
    ) -> StoreResult<Vec<ParticipantBooking>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.find_participant_bookings(participants, window)
    }
}

struct DownStore;

impl BookingStore for DownStore {
    fn find_participant_bookings(
        &self,
        _participants: &[ParticipantId],
        _window: &TimeWindow,
    ) -> StoreResult<Vec<ParticipantBooking>> {
        Err(StoreError::Timeout)
    }
}

// ── Basic search ───────────────────────────────────────────────────────────

#[test]
fn nearest_slot_on_each_side_is_suggested() {
    // Request 14:00-15:00 is taken; nothing else is booked.
    let store = MemoryStore::from_bookings([booking("p1", "e1", window(14, 15, 14, 45))]);
    let suggester = FreeSlotSuggester::with_options(&store, options(2, StepPolicy::Advance));

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    assert_eq!(slots, vec![window(13, 0, 14, 0), window(15, 0, 16, 0)]);
}

#[test]
fn default_options_collect_four_slots_alternating() {
    let store = MemoryStore::from_bookings([booking("p1", "e1", window(14, 15, 14, 45))]);
    let suggester = FreeSlotSuggester::new(&store);
    assert_eq!(suggester.options().max_suggestions, 4);

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    assert_eq!(
        slots,
        vec![
            window(12, 0, 13, 0),
            window(13, 0, 14, 0),
            window(15, 0, 16, 0),
            window(16, 0, 17, 0),
        ]
    );
}

#[test]
fn every_slot_keeps_the_requested_duration() {
    let store = MemoryStore::from_bookings([
        booking("p1", "e1", window(10, 0, 10, 50)),
        booking("p2", "e2", window(11, 30, 12, 0)),
    ]);
    let suggester = FreeSlotSuggester::with_options(&store, options(6, StepPolicy::Advance));
    let request = window(10, 20, 11, 5);

    let slots = suggester
        .suggest_free_slots_at(&request, &ids(&["p1", "p2"]), now(), None)
        .unwrap();

    assert!(!slots.is_empty());
    for slot in &slots {
        assert_eq!(slot.duration(), Duration::minutes(45));
    }
}

#[test]
fn suggestions_are_sorted_and_conflict_free() {
    let store = MemoryStore::from_bookings([
        booking("p1", "e1", window(9, 0, 9, 30)),
        booking("p1", "e2", window(12, 0, 13, 0)),
        booking("p2", "e3", window(14, 0, 15, 0)),
        booking("p2", "e4", window(16, 30, 17, 0)),
    ]);
    let participants = ids(&["p1", "p2"]);
    let suggester = FreeSlotSuggester::with_options(&store, options(5, StepPolicy::Advance));

    let slots = suggester
        .suggest_free_slots_at(&window(12, 0, 13, 0), &participants, now(), None)
        .unwrap();

    assert_eq!(slots.len(), 5);
    assert!(slots.windows(2).all(|pair| pair[0].start <= pair[1].start));

    let detector = ConflictDetector::new(&store);
    for slot in &slots {
        let groups = detector.detect_conflicts(slot, &participants).unwrap();
        assert!(groups.is_empty(), "suggested {slot:?} conflicts: {groups:?}");
    }
}

// ── Step policies ──────────────────────────────────────────────────────────

#[test]
fn advance_policy_steps_past_an_occupied_slot() {
    let store = MemoryStore::from_bookings([
        booking("p1", "e1", window(14, 15, 14, 45)),
        booking("p1", "e2", window(12, 30, 12, 45)),
    ]);
    let suggester = FreeSlotSuggester::with_options(&store, options(4, StepPolicy::Advance));

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    // 12:00-13:00 is busy; the backward cursor moves on to 11:00.
    assert_eq!(
        slots,
        vec![
            window(11, 0, 12, 0),
            window(13, 0, 14, 0),
            window(15, 0, 16, 0),
            window(16, 0, 17, 0),
        ]
    );
}

#[test]
fn stall_policy_keeps_a_blocked_cursor_in_place() {
    let store = MemoryStore::from_bookings([
        booking("p1", "e1", window(14, 15, 14, 45)),
        booking("p1", "e2", window(12, 30, 12, 45)),
    ]);
    let suggester = FreeSlotSuggester::with_options(&store, options(4, StepPolicy::Stall));

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    // The backward cursor sticks at 12:00; the forward cursor supplies the rest.
    assert_eq!(
        slots,
        vec![
            window(13, 0, 14, 0),
            window(15, 0, 16, 0),
            window(16, 0, 17, 0),
            window(17, 0, 18, 0),
        ]
    );
}

#[test]
fn stalled_search_stops_at_iteration_cap() {
    let store = MemoryStore::from_bookings([
        booking("p1", "e1", window(14, 15, 14, 45)),
        booking("p1", "e2", window(12, 30, 12, 45)),
        booking("p1", "e3", window(15, 30, 15, 45)),
    ]);
    let suggester = FreeSlotSuggester::with_options(
        &store,
        SuggestOptions {
            max_iterations: 50,
            ..options(4, StepPolicy::Stall)
        },
    );

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    assert_eq!(slots, vec![window(13, 0, 14, 0)]);
}

// ── Horizon and bail-out ───────────────────────────────────────────────────

#[test]
fn fully_booked_day_yields_no_suggestions() {
    let store = MemoryStore::from_bookings([booking("p1", "e1", window(0, 0, 23, 30))]);
    let suggester = FreeSlotSuggester::new(&store);

    let slots = suggester
        .suggest_free_slots_at(&window(10, 0, 11, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    assert!(slots.is_empty(), "fewer than requested is not an error");
}

#[test]
fn lookaround_days_extend_the_search_to_neighbouring_days() {
    let store = MemoryStore::from_bookings([booking("p1", "e1", window(0, 0, 23, 30))]);
    let suggester = FreeSlotSuggester::with_options(
        &store,
        SuggestOptions {
            lookaround_days: 1,
            ..options(2, StepPolicy::Advance)
        },
    );

    let slots = suggester
        .suggest_free_slots_at(&window(10, 0, 11, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    // 23:00-00:00 on the 15th touches the booking at midnight, so 22:00 is the
    // first free hour before; the first free hour after is midnight of the 17th.
    assert_eq!(
        slots,
        vec![
            TimeWindow {
                start: at(15, 22, 0),
                end: at(15, 23, 0),
            },
            TimeWindow {
                start: at(17, 0, 0),
                end: at(17, 1, 0),
            },
        ]
    );
}

#[test]
fn search_bails_out_before_epoch_and_past_horizon() {
    let request = TimeWindow {
        start: Utc.with_ymd_and_hms(1970, 1, 1, 0, 30, 0).unwrap(),
        end: Utc.with_ymd_and_hms(1970, 1, 1, 1, 30, 0).unwrap(),
    };
    let store = MemoryStore::new();
    let suggester = FreeSlotSuggester::new(&store);

    // "Now" a year before the epoch: the forward cursor is already past the horizon
    // and the backward cursor starts before the epoch.
    let early_now = Utc.with_ymd_and_hms(1969, 1, 1, 0, 0, 0).unwrap();
    let slots = suggester
        .suggest_free_slots_at(&request, &ids(&["p1"]), early_now, None)
        .unwrap();
    assert!(slots.is_empty());

    // With a present-day clock only one bail-out condition holds; the search runs.
    let slots = suggester
        .suggest_free_slots_at(&request, &ids(&["p1"]), now(), None)
        .unwrap();
    assert!(!slots.is_empty());
}

#[test]
fn search_continues_while_backward_cursor_is_after_the_epoch() {
    let store = MemoryStore::from_bookings([booking("p1", "e1", window(14, 15, 14, 45))]);
    let suggester = FreeSlotSuggester::with_options(&store, options(2, StepPolicy::Advance));

    // The forward cursor is already far past a year from this clock, but the
    // backward cursor is not before the epoch, so only one condition holds.
    let early_now = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), early_now, None)
        .unwrap();

    assert_eq!(slots, vec![window(13, 0, 14, 0), window(15, 0, 16, 0)]);
}

#[test]
fn unbounded_horizon_does_not_overflow() {
    let store = MemoryStore::from_bookings([booking("p1", "e1", window(14, 15, 14, 45))]);
    let suggester = FreeSlotSuggester::with_options(
        &store,
        SuggestOptions {
            horizon: Duration::MAX,
            ..options(2, StepPolicy::Advance)
        },
    );

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    assert_eq!(slots, vec![window(13, 0, 14, 0), window(15, 0, 16, 0)]);
}

#[test]
fn huge_lookaround_saturates_the_fetch_span() {
    let store = MemoryStore::from_bookings([booking("p1", "e1", window(14, 15, 14, 45))]);
    let suggester = FreeSlotSuggester::with_options(
        &store,
        SuggestOptions {
            lookaround_days: u32::MAX,
            ..SuggestOptions::default()
        },
    );

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    assert_eq!(
        slots,
        vec![
            window(12, 0, 13, 0),
            window(13, 0, 14, 0),
            window(15, 0, 16, 0),
            window(16, 0, 17, 0),
        ]
    );
}

#[test]
fn window_at_the_end_of_time_does_not_overflow() {
    let end = DateTime::<Utc>::MAX_UTC;
    let request = TimeWindow {
        start: end - Duration::hours(1),
        end,
    };
    let suggester = FreeSlotSuggester::new(MemoryStore::new());

    let slots = suggester
        .suggest_free_slots_at(&request, &ids(&["p1"]), now(), None)
        .unwrap();

    // Nothing fits after the request; the backward cursor still finds a slot.
    assert_eq!(
        slots,
        vec![TimeWindow {
            start: end - Duration::hours(2),
            end: end - Duration::hours(1),
        }]
    );
}

// ── Per-call limit ─────────────────────────────────────────────────────────

#[test]
fn per_call_limit_overrides_configured_maximum() {
    let store = MemoryStore::from_bookings([booking("p1", "e1", window(14, 15, 14, 45))]);
    let suggester = FreeSlotSuggester::new(&store);

    let one = suggester
        .suggest_up_to(&window(14, 0, 15, 0), &ids(&["p1"]), 1)
        .unwrap();
    let six = suggester
        .suggest_up_to(&window(14, 0, 15, 0), &ids(&["p1"]), 6)
        .unwrap();

    assert_eq!(one, vec![window(13, 0, 14, 0)]);
    assert_eq!(six.len(), 6);
    assert_eq!(six[0], window(11, 0, 12, 0));
    assert_eq!(six[5], window(17, 0, 18, 0));
    assert!(suggester
        .suggest_up_to(&window(14, 0, 15, 0), &ids(&["p1"]), 0)
        .unwrap()
        .is_empty());
}

// ── Inputs and errors ──────────────────────────────────────────────────────

#[test]
fn no_participants_means_adjacent_slots_without_a_query() {
    let store = CountingStore {
        inner: MemoryStore::new(),
        queries: AtomicUsize::new(0),
    };
    let suggester = FreeSlotSuggester::with_options(&store, options(2, StepPolicy::Advance));

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &[], now(), None)
        .unwrap();

    assert_eq!(slots, vec![window(13, 0, 14, 0), window(15, 0, 16, 0)]);
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
}

#[test]
fn store_is_queried_exactly_once() {
    let store = CountingStore {
        inner: MemoryStore::from_bookings([booking("p1", "e1", window(12, 30, 12, 45))]),
        queries: AtomicUsize::new(0),
    };
    let suggester = FreeSlotSuggester::new(&store);

    suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    assert_eq!(store.queries.load(Ordering::SeqCst), 1);
}

#[test]
fn store_failure_propagates() {
    let suggester = FreeSlotSuggester::new(DownStore);

    let err = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), None)
        .unwrap_err();

    assert!(matches!(err, ScheduleError::Store(StoreError::Timeout)));
}

#[test]
fn zero_length_window_yields_no_suggestions() {
    let store = CountingStore {
        inner: MemoryStore::new(),
        queries: AtomicUsize::new(0),
    };
    let suggester = FreeSlotSuggester::new(&store);

    let slots = suggester
        .suggest_free_slots_at(&window(14, 0, 14, 0), &ids(&["p1"]), now(), None)
        .unwrap();

    assert!(slots.is_empty());
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
}

#[test]
fn inverted_window_is_rejected() {
    let suggester = FreeSlotSuggester::new(MemoryStore::new());

    let err = suggester
        .suggest_free_slots_at(&window(15, 0, 14, 0), &ids(&["p1"]), now(), None)
        .unwrap_err();

    assert!(matches!(err, ScheduleError::InvalidWindow { .. }));
}

#[test]
fn cancelled_search_returns_cancelled() {
    let suggester = FreeSlotSuggester::new(MemoryStore::new());
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = suggester
        .suggest_free_slots_at(&window(14, 0, 15, 0), &ids(&["p1"]), now(), Some(&cancel))
        .unwrap_err();

    assert!(matches!(err, ScheduleError::Cancelled));
}
