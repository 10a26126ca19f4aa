//! Concurrent access acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - M callers issuing one call each receive M distinct values
//! - Under sustained contention, no value is issued twice
//! - Every caller still observes its own ticks strictly increasing

use super::common::{collect, duplicate_count, first_ordering_violation, num_cpus};
use std::sync::{Arc, Barrier};
use std::thread;
use tick_common::config::{ClockKind, GeneratorConfig};
use tick_source::{CoarseClock, ManualClock, PreciseClock, TickGenerator};

#[test]
fn test_one_call_per_thread_is_unique() {
    let callers = (num_cpus() * 4).max(16);
    let generator = TickGenerator::new(PreciseClock);
    let barrier = Barrier::new(callers);

    let values: Vec<i64> = thread::scope(|s| {
        let handles: Vec<_> = (0..callers)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    generator.next_tick().unwrap().get()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(values.len(), callers);
    assert_eq!(duplicate_count(&values), 0);
}

#[test]
fn test_contention_on_coarse_clock() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 20_000;

    let generator = Arc::new(TickGenerator::new(CoarseClock));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let generator = Arc::clone(&generator);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                collect(&*generator, PER_THREAD)
            })
        })
        .collect();

    let mut all = Vec::with_capacity(THREADS * PER_THREAD);
    for handle in handles {
        let values = handle.join().unwrap();
        assert_eq!(first_ordering_violation(&values), None);
        all.extend(values);
    }

    assert_eq!(all.len(), THREADS * PER_THREAD);
    assert_eq!(duplicate_count(&all), 0);

    // The whole-second clock cannot keep up; most values are synthetic
    let stats = generator.stats();
    assert_eq!(stats.issued, (THREADS * PER_THREAD) as u64);
    assert!(stats.fallbacks > 0);
    assert_eq!(stats.last_tick.get(), *all.iter().max().unwrap());
}

#[test]
fn test_stalled_clock_hands_out_contiguous_range() {
    const THREADS: usize = 6;
    const PER_THREAD: usize = 1_000;
    let start = 1_000_000;

    let generator = TickGenerator::new(ManualClock::new(start));
    let mut all: Vec<i64> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| collect(&generator, PER_THREAD)))
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    all.sort_unstable();
    let expected: Vec<i64> = (start..start + (THREADS * PER_THREAD) as i64).collect();
    assert_eq!(all, expected);
}

#[test]
fn test_configured_generator_shared_across_threads() {
    let generator = Arc::new(TickGenerator::from_config(&GeneratorConfig {
        clock: ClockKind::System,
        ..GeneratorConfig::default()
    }));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || collect(&*generator, 5_000))
        })
        .collect();

    let all: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(duplicate_count(&all), 0);
    assert_eq!(generator.clock().name(), "system");
}
