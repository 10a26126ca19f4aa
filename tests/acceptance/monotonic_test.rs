//! Ordering acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - Consecutive ticks are strictly increasing on every clock
//! - A repeated reading yields the previous tick plus one
//! - Once the clock overtakes the synthetic counter, its reading is issued
//! - Ticks convert back to the civil time they were read at

use super::common::{
    collect, first_ordering_violation, ReplayClock, JAN_1_2001_TICKS, JAN_1_2001_UNIX,
};
use std::time::{Duration, SystemTime};
use tick_common::error::TickError;
use tick_common::time::{Tick, EPOCH_OFFSET_SECS, TICKS_PER_SECOND};
use tick_source::{CoarseClock, PreciseClock, SystemClock, TickGenerator};

#[test]
fn test_reference_scenario() {
    let generator = TickGenerator::new(ReplayClock::new([100, 100, 100_000]));
    assert_eq!(collect(&generator, 3), vec![100, 101, 100_000]);
}

#[test]
fn test_repeated_reading_adds_exactly_one() {
    let base = JAN_1_2001_TICKS;
    let generator = TickGenerator::new(ReplayClock::new([base, base]));
    let first = generator.next_tick().unwrap();
    let second = generator.next_tick().unwrap();
    assert_eq!(second.get(), first.get() + 1);
}

#[test]
fn test_coarse_window_then_resumption() {
    // Five calls inside one whole-second window, then the next second
    let second = JAN_1_2001_TICKS;
    let next_second = second + TICKS_PER_SECOND;
    let readings = [second, second, second, second, second, next_second];
    let generator = TickGenerator::new(ReplayClock::new(readings));

    let values = collect(&generator, 6);
    assert_eq!(
        values,
        vec![
            second,
            second + 1,
            second + 2,
            second + 3,
            second + 4,
            next_second
        ]
    );

    let stats = generator.stats();
    assert_eq!(stats.fallbacks, 4);
    assert_eq!(stats.realignments, 1);
    assert_eq!(stats.max_lead_ticks, 4);
}

#[test]
fn test_backward_step_never_reissues() {
    let generator = TickGenerator::new(ReplayClock::new([5_000, 4_000, 3_000, 5_001, 9_000]));
    assert_eq!(
        collect(&generator, 5),
        vec![5_000, 5_001, 5_002, 5_003, 9_000]
    );
}

#[test]
fn test_exhausted_clock_is_fatal() {
    let clock = ReplayClock::new([700]);
    let generator = TickGenerator::new(&clock);
    assert_eq!(generator.next_tick().unwrap().get(), 700);

    let err = generator.next_tick().unwrap_err();
    assert!(matches!(err, TickError::ClockUnavailable(_)));
    assert_eq!(generator.last_emitted().get(), 700);
    assert_eq!(clock.remaining(), 0);
}

#[test]
fn test_precise_clock_sequence() {
    let generator = TickGenerator::new(PreciseClock);
    let values = collect(&generator, 100_000);
    assert_eq!(first_ordering_violation(&values), None);
    assert!(values[0] > JAN_1_2001_TICKS);
}

#[test]
fn test_coarse_clock_sequence() {
    let generator = TickGenerator::new(CoarseClock);
    let values = collect(&generator, 100_000);
    assert_eq!(first_ordering_violation(&values), None);

    // The first tick is a whole-second reading
    assert_eq!(values[0] % TICKS_PER_SECOND, 0);
    assert!(generator.stats().fallbacks > 0);
}

#[test]
fn test_system_clock_sequence() {
    let generator = TickGenerator::new(SystemClock);
    let values = collect(&generator, 10_000);
    assert_eq!(first_ordering_violation(&values), None);
}

#[test]
fn test_tick_tracks_wall_time() {
    let before = Tick::from_system_time(SystemTime::now()).unwrap();
    let tick = TickGenerator::new(PreciseClock).next_tick().unwrap();
    let after = Tick::from_system_time(SystemTime::now()).unwrap();

    // Precise readings are truncated to 100ns; allow one second of slack
    let slack = TICKS_PER_SECOND;
    assert!(tick.get() >= before.get() - slack);
    assert!(tick.get() <= after.get() + slack);
}

#[test]
fn test_epoch_conversion_reference() {
    let tick = Tick::checked_from_unix_seconds(JAN_1_2001_UNIX).unwrap();
    assert_eq!(tick.get(), 126_227_808_000_000_000);
    assert_eq!(
        tick.get(),
        (JAN_1_2001_UNIX + EPOCH_OFFSET_SECS) * TICKS_PER_SECOND
    );
    assert_eq!(
        tick.to_rfc3339().as_deref(),
        Some("2001-01-01T00:00:00.000000000Z")
    );
    assert_eq!(Tick::parse_rfc3339("2001-01-01T00:00:00Z").unwrap(), tick);
}

#[test]
fn test_civil_roundtrip_of_issued_tick() {
    let tick = TickGenerator::new(PreciseClock).next_tick().unwrap();
    let time = tick.to_system_time().unwrap();
    let now = SystemTime::now();
    let skew = now
        .duration_since(time)
        .unwrap_or_else(|e| e.duration());
    assert!(skew < Duration::from_secs(5));
}

#[test]
fn test_process_wide_generator() {
    let values: Vec<i64> = (0..1_000)
        .map(|_| tick_source::next_tick().unwrap().get())
        .collect();
    assert_eq!(first_ordering_violation(&values), None);
}
