//! FILETIME tick arithmetic.
//!
//! A tick is one 100ns interval since 1601-01-01T00:00:00Z. Conversions to
//! and from the Unix epoch use the fixed 11,644,473,600 second offset, so a
//! tick can be turned back into a civil timestamp without any other context.

use crate::error::{TickError, TickResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between 1601-01-01 and 1970-01-01.
pub const EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Nanoseconds in one tick.
pub const NANOS_PER_TICK: i64 = 100;

/// Tick value of 1970-01-01T00:00:00Z.
pub const UNIX_EPOCH_TICKS: i64 = EPOCH_OFFSET_SECS * TICKS_PER_SECOND;

/// First Unix second the RFC 3339 formatter cannot render (year 10000).
const RFC3339_LIMIT_SECS: i64 = 253_402_300_800;

/// Number of 100ns intervals since 1601-01-01T00:00:00Z.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(i64);

impl Tick {
    /// The FILETIME epoch itself.
    pub const ZERO: Tick = Tick(0);

    /// Wrap a raw tick count.
    #[must_use]
    pub const fn new(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Raw tick count.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Rebase whole seconds since 1970 onto the FILETIME epoch.
    ///
    /// Returns `None` if the result does not fit in an `i64`.
    #[must_use]
    pub fn checked_from_unix_seconds(secs: i64) -> Option<Self> {
        secs.checked_add(EPOCH_OFFSET_SECS)?
            .checked_mul(TICKS_PER_SECOND)
            .map(Self)
    }

    /// Rebase a `(seconds, nanoseconds)` Unix reading, truncating to 100ns.
    #[must_use]
    pub fn checked_from_unix_parts(secs: i64, nanos: u32) -> Option<Self> {
        let whole = Self::checked_from_unix_seconds(secs)?;
        whole
            .0
            .checked_add(i64::from(nanos) / NANOS_PER_TICK)
            .map(Self)
    }

    /// Convert a `SystemTime`, including instants before 1970.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the instant cannot be expressed in ticks.
    pub fn from_system_time(time: SystemTime) -> TickResult<Self> {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => duration_ticks(after).and_then(|t| UNIX_EPOCH_TICKS.checked_add(t)),
            Err(before) => {
                duration_ticks(before.duration()).and_then(|t| UNIX_EPOCH_TICKS.checked_sub(t))
            }
        };

        ticks
            .map(Self)
            .ok_or_else(|| TickError::OutOfRange(format!("{time:?} is outside the tick range")))
    }

    /// Convert back to a `SystemTime`.
    ///
    /// Returns `None` if the platform cannot represent the instant.
    #[must_use]
    pub fn to_system_time(self) -> Option<SystemTime> {
        let rel = self.0.checked_sub(UNIX_EPOCH_TICKS)?;
        let span = ticks_duration(rel.unsigned_abs());
        if rel >= 0 {
            UNIX_EPOCH.checked_add(span)
        } else {
            UNIX_EPOCH.checked_sub(span)
        }
    }

    /// Whole seconds since 1970, rounded towards negative infinity.
    #[must_use]
    pub fn unix_seconds(self) -> i64 {
        self.0.div_euclid(TICKS_PER_SECOND) - EPOCH_OFFSET_SECS
    }

    /// Ticks past the last whole second.
    #[must_use]
    pub fn subsec_ticks(self) -> i64 {
        self.0.rem_euclid(TICKS_PER_SECOND)
    }

    /// Render as an RFC 3339 UTC timestamp with nanosecond precision.
    ///
    /// Only instants between 1970 and the end of year 9999 can be rendered.
    #[must_use]
    pub fn to_rfc3339(self) -> Option<String> {
        let secs = self.unix_seconds();
        if !(0..RFC3339_LIMIT_SECS).contains(&secs) {
            return None;
        }
        let time = self.to_system_time()?;
        Some(humantime::format_rfc3339_nanos(time).to_string())
    }

    /// Parse an RFC 3339 UTC timestamp such as `2001-01-01T00:00:00Z`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimestamp` if the string is not valid RFC 3339.
    pub fn parse_rfc3339(input: &str) -> TickResult<Self> {
        let time = humantime::parse_rfc3339(input.trim())
            .map_err(|e| TickError::InvalidTimestamp(format!("{input:?}: {e}")))?;
        Self::from_system_time(time)
    }

    /// Distance to an earlier tick as a `Duration`, or `None` if `earlier` is later.
    #[must_use]
    pub fn duration_since(self, earlier: Tick) -> Option<Duration> {
        let diff = self.0.checked_sub(earlier.0)?;
        u64::try_from(diff).ok().map(ticks_duration)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Tick {
    fn from(ticks: i64) -> Self {
        Self(ticks)
    }
}

impl From<Tick> for i64 {
    fn from(tick: Tick) -> Self {
        tick.0
    }
}

/// Convert a tick count to a `Duration`.
#[must_use]
pub fn ticks_duration(ticks: u64) -> Duration {
    let per_sec = TICKS_PER_SECOND.unsigned_abs();
    let nanos = (ticks % per_sec) * NANOS_PER_TICK.unsigned_abs();
    // nanos < 1_000_000_000
    Duration::new(ticks / per_sec, u32::try_from(nanos).unwrap_or(0))
}

/// Convert a `Duration` to whole ticks, or `None` if it exceeds `i64`.
#[must_use]
pub fn duration_ticks(duration: Duration) -> Option<i64> {
    i64::try_from(duration.as_nanos() / u128::from(NANOS_PER_TICK.unsigned_abs())).ok()
}
