//! Concurrent uniqueness check.
//!
//! Spawns scoped threads that share one generator, then verifies that the
//! combined output holds no duplicates and that every thread observed a
//! strictly increasing sequence.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tick_common::metrics::GeneratorStats;
use tick_source::{TickGenerator, WallClock};
use tracing::{debug, info};

/// Outcome of a check run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Name of the clock under test.
    pub clock: &'static str,
    /// Worker threads.
    pub threads: usize,
    /// Ticks requested per thread.
    pub per_thread: usize,
    /// Ticks collected across all threads.
    pub total: usize,
    /// Values issued more than once.
    pub duplicates: usize,
    /// Places where a thread saw a tick not greater than its predecessor.
    pub ordering_violations: usize,
    /// Wall time spent issuing.
    #[serde(serialize_with = "serialize_elapsed")]
    pub elapsed: Duration,
    /// Generator counters after the run.
    pub stats: GeneratorStats,
}

impl CheckReport {
    /// Whether the run upheld uniqueness and per-thread ordering.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.duplicates == 0 && self.ordering_violations == 0
    }

    /// Issued ticks per second over the whole run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} threads x {} ticks on the {} clock",
            if self.passed() { "PASS" } else { "FAIL" },
            self.threads,
            self.per_thread,
            self.clock
        )?;
        writeln!(f, "  total:               {}", self.total)?;
        writeln!(f, "  duplicates:          {}", self.duplicates)?;
        writeln!(f, "  ordering violations: {}", self.ordering_violations)?;
        writeln!(f, "  fallbacks:           {}", self.stats.fallbacks)?;
        writeln!(f, "  realignments:        {}", self.stats.realignments)?;
        writeln!(
            f,
            "  max lead:            {}",
            humantime::format_duration(self.stats.max_lead())
        )?;
        write!(
            f,
            "  elapsed:             {} ({:.0} ticks/s)",
            humantime::format_duration(self.elapsed),
            self.rate()
        )
    }
}

fn serialize_elapsed<S>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*elapsed).to_string())
}

/// Run `threads` workers issuing `per_thread` ticks each from `generator`.
///
/// # Errors
///
/// Returns an error if a worker fails to read the clock or panics.
pub fn run_check<C: WallClock>(
    generator: &TickGenerator<C>,
    threads: usize,
    per_thread: usize,
) -> Result<CheckReport> {
    let threads = threads.max(1);
    info!(
        threads,
        per_thread,
        clock = generator.clock().name(),
        "Starting uniqueness check"
    );

    let started = Instant::now();
    let sequences = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    (0..per_thread)
                        .map(|_| generator.next_tick().map(i64::from))
                        .collect::<Result<Vec<i64>, _>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .map_err(|_| anyhow!("check worker panicked"))?
                    .map_err(anyhow::Error::from)
            })
            .collect::<Result<Vec<_>>>()
    })?;
    let elapsed = started.elapsed();

    let ordering_violations = sequences
        .iter()
        .map(|seq| seq.windows(2).filter(|w| w[1] <= w[0]).count())
        .sum();

    let mut all: Vec<i64> = sequences.into_iter().flatten().collect();
    all.sort_unstable();
    let duplicates = all.windows(2).filter(|w| w[0] == w[1]).count();
    debug!(total = all.len(), duplicates, ordering_violations, "Check finished");

    Ok(CheckReport {
        clock: generator.clock().name(),
        threads,
        per_thread,
        total: all.len(),
        duplicates,
        ordering_violations,
        elapsed,
        stats: generator.stats(),
    })
}
