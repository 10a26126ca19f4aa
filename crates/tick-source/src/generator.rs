//! Strictly increasing tick generator.
//!
//! Each query reads the wall clock and compares the reading with the last
//! issued tick:
//!
//! - reading > last: the reading is issued and becomes the new last tick
//! - reading <= last: `last + 1` is issued instead
//!
//! The second branch covers clocks coarser than a tick as well as clocks
//! stepping backward. After a burst of such calls the issued values run
//! ahead of the wall clock until a reading overtakes them again.
//!
//! The compare-and-update step is a compare-and-swap loop on one atomic
//! cell, so a generator can be shared between threads and every caller
//! still receives a distinct, ordered value.

use crate::clock::{clock_for, PreciseClock, WallClock};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tick_common::config::GeneratorConfig;
use tick_common::error::{TickError, TickResult};
use tick_common::metrics::GeneratorStats;
use tick_common::time::{duration_ticks, ticks_duration, Tick, TICKS_PER_SECOND};
use tracing::{debug, warn};

/// Monotonic FILETIME tick source.
#[derive(Debug)]
pub struct TickGenerator<C = PreciseClock> {
    /// Wall clock feeding raw readings.
    clock: C,
    /// Last issued tick; zero before the first call.
    last: CachePadded<AtomicI64>,
    /// Advisory counters behind [`TickGenerator::stats`].
    counters: Counters,
    /// Lead over the wall clock, in ticks, above which a warning is logged.
    drift_warn_ticks: i64,
}

#[derive(Debug, Default)]
struct Counters {
    issued: AtomicU64,
    fallbacks: AtomicU64,
    realignments: AtomicU64,
    max_lead: AtomicU64,
    /// Set by a fallback issuance, cleared by the next raw one.
    running_ahead: AtomicBool,
    /// One drift warning per burst.
    drift_warned: AtomicBool,
}

impl<C: WallClock> TickGenerator<C> {
    /// Create a generator with fresh state reading from `clock`.
    pub fn new(clock: C) -> Self {
        debug!(
            clock = clock.name(),
            resolution_ticks = clock.resolution_ticks(),
            "Creating tick generator"
        );

        Self {
            clock,
            last: CachePadded::new(AtomicI64::new(0)),
            counters: Counters::default(),
            drift_warn_ticks: TICKS_PER_SECOND,
        }
    }

    /// Log a warning once issued ticks lead the wall clock by more than `threshold`.
    #[must_use]
    pub fn with_drift_warning(mut self, threshold: Duration) -> Self {
        self.drift_warn_ticks = duration_ticks(threshold).unwrap_or(i64::MAX);
        self
    }

    /// Issue the next tick.
    ///
    /// The result is strictly greater than every tick previously issued by
    /// this generator, on any thread.
    ///
    /// # Errors
    ///
    /// Returns `ClockUnavailable` if the clock cannot be read; nothing is
    /// issued and the generator state is unchanged. Returns `OutOfRange`
    /// if the counter would pass `i64::MAX`.
    pub fn next_tick(&self) -> TickResult<Tick> {
        let raw = self.clock.read_raw_ticks()?;
        self.issue(raw)
    }

    /// Compare-and-update against a raw reading.
    fn issue(&self, raw: i64) -> TickResult<Tick> {
        let mut last = self.last.load(Ordering::Acquire);

        loop {
            let next = if raw > last {
                raw
            } else {
                last.checked_add(1).ok_or_else(|| {
                    TickError::OutOfRange(format!("tick counter exhausted at {last}"))
                })?
            };

            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.record(raw, next);
                    return Ok(Tick::new(next));
                }
                Err(current) => last = current,
            }
        }
    }

    fn record(&self, raw: i64, issued: i64) {
        let c = &self.counters;
        c.issued.fetch_add(1, Ordering::Relaxed);

        if issued == raw {
            if c.running_ahead.swap(false, Ordering::Relaxed) {
                c.realignments.fetch_add(1, Ordering::Relaxed);
                c.drift_warned.store(false, Ordering::Relaxed);
                debug!(tick = issued, "Wall clock caught up with issued ticks");
            }
            return;
        }

        // issued = last + 1 > last >= raw
        let lead = issued.saturating_sub(raw);
        c.fallbacks.fetch_add(1, Ordering::Relaxed);
        c.max_lead.fetch_max(lead.unsigned_abs(), Ordering::Relaxed);

        if !c.running_ahead.swap(true, Ordering::Relaxed) {
            debug!(
                raw,
                tick = issued,
                clock = self.clock.name(),
                "Clock has not advanced past last tick, issuing increments"
            );
        }

        if lead > self.drift_warn_ticks && !c.drift_warned.swap(true, Ordering::Relaxed) {
            warn!(
                lead_ticks = lead,
                lead = ?ticks_duration(lead.unsigned_abs()),
                clock = self.clock.name(),
                "Issued ticks are running ahead of the wall clock"
            );
        }
    }

    /// Last issued tick (zero before the first call).
    #[must_use]
    pub fn last_emitted(&self) -> Tick {
        Tick::new(self.last.load(Ordering::Acquire))
    }

    /// Snapshot of the generator counters.
    #[must_use]
    pub fn stats(&self) -> GeneratorStats {
        let c = &self.counters;
        GeneratorStats {
            issued: c.issued.load(Ordering::Relaxed),
            fallbacks: c.fallbacks.load(Ordering::Relaxed),
            realignments: c.realignments.load(Ordering::Relaxed),
            max_lead_ticks: c.max_lead.load(Ordering::Relaxed),
            last_tick: self.last_emitted(),
        }
    }

    /// The clock feeding this generator.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl TickGenerator<Box<dyn WallClock>> {
    /// Create a generator with the clock and drift threshold from configuration.
    #[must_use]
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(clock_for(config.clock)).with_drift_warning(config.drift_warn_threshold)
    }
}

impl Default for TickGenerator<PreciseClock> {
    fn default() -> Self {
        Self::new(PreciseClock)
    }
}

static GLOBAL: OnceLock<TickGenerator<PreciseClock>> = OnceLock::new();

/// Process-wide generator on the precise platform clock.
pub fn global() -> &'static TickGenerator<PreciseClock> {
    GLOBAL.get_or_init(TickGenerator::default)
}

/// Issue the next tick from the process-wide generator.
///
/// # Errors
///
/// See [`TickGenerator::next_tick`].
pub fn next_tick() -> TickResult<Tick> {
    global().next_tick()
}
