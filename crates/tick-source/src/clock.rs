//! Platform wall clocks expressed in FILETIME ticks.
//!
//! Every clock strategy implements [`WallClock`] and hands back a raw tick
//! count since 1601-01-01T00:00:00Z. The generator never looks further than
//! that number, so the collision-avoidance logic is identical on every
//! platform:
//!
//! - [`PreciseClock`]: `clock_gettime(CLOCK_REALTIME)` on Unix,
//!   `GetSystemTimePreciseAsFileTime` on Windows
//! - [`CoarseClock`]: `time(2)`, whole seconds only
//! - [`SystemClock`]: `std::time::SystemTime`
//! - [`ManualClock`]: settable reading for simulations and tests

#![allow(unused_imports)] // Platform-specific code may not use all imports

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tick_common::config::ClockKind;
use tick_common::error::{TickError, TickResult};
use tick_common::time::{Tick, TICKS_PER_SECOND};
use tracing::error;

/// Source of raw wall-clock readings.
pub trait WallClock: Send + Sync + fmt::Debug {
    /// Current wall-clock time as ticks since 1601-01-01T00:00:00Z.
    ///
    /// # Errors
    ///
    /// Returns `ClockUnavailable` if the platform cannot produce a reading.
    fn read_raw_ticks(&self) -> TickResult<i64>;

    /// Granularity of successive readings, in ticks.
    fn resolution_ticks(&self) -> i64;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

impl<T: WallClock + ?Sized> WallClock for Box<T> {
    fn read_raw_ticks(&self) -> TickResult<i64> {
        (**self).read_raw_ticks()
    }

    fn resolution_ticks(&self) -> i64 {
        (**self).resolution_ticks()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: WallClock + ?Sized> WallClock for Arc<T> {
    fn read_raw_ticks(&self) -> TickResult<i64> {
        (**self).read_raw_ticks()
    }

    fn resolution_ticks(&self) -> i64 {
        (**self).resolution_ticks()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: WallClock + ?Sized> WallClock for &T {
    fn read_raw_ticks(&self) -> TickResult<i64> {
        (**self).read_raw_ticks()
    }

    fn resolution_ticks(&self) -> i64 {
        (**self).resolution_ticks()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Native sub-second wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreciseClock;

impl WallClock for PreciseClock {
    fn read_raw_ticks(&self) -> TickResult<i64> {
        platform::precise_ticks()
    }

    fn resolution_ticks(&self) -> i64 {
        1
    }

    fn name(&self) -> &'static str {
        "precise"
    }
}

/// Whole-second wall clock.
///
/// Readings are `(seconds_since_1970 + 11_644_473_600) * 10_000_000`, so
/// consecutive calls within the same second return the same value and the
/// generator has to fall back to increments.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoarseClock;

impl WallClock for CoarseClock {
    fn read_raw_ticks(&self) -> TickResult<i64> {
        platform::coarse_ticks()
    }

    fn resolution_ticks(&self) -> i64 {
        TICKS_PER_SECOND
    }

    fn name(&self) -> &'static str {
        "coarse"
    }
}

/// Portable clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn read_raw_ticks(&self) -> TickResult<i64> {
        system_ticks()
    }

    fn resolution_ticks(&self) -> i64 {
        1
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// Clock whose reading is set by hand.
///
/// Used to replay specific reading sequences (stalled, coarse or backward
/// moving clocks) against a generator.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
    resolution: i64,
    failing: AtomicBool,
}

impl ManualClock {
    /// Create a clock that reads `start` until changed.
    #[must_use]
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
            resolution: 1,
            failing: AtomicBool::new(false),
        }
    }

    /// Report a different resolution from [`WallClock::resolution_ticks`].
    #[must_use]
    pub fn with_resolution(mut self, ticks: i64) -> Self {
        self.resolution = ticks.max(1);
        self
    }

    /// Set the reading.
    pub fn set(&self, ticks: i64) {
        self.now.store(ticks, Ordering::Release);
    }

    /// Move the reading by `delta` ticks (negative moves it backward).
    pub fn advance(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::AcqRel);
    }

    /// Current reading, without failure injection.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }

    /// Make subsequent reads fail with `ClockUnavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl WallClock for ManualClock {
    fn read_raw_ticks(&self) -> TickResult<i64> {
        if self.failing.load(Ordering::Acquire) {
            return Err(TickError::ClockUnavailable(
                "manual clock is set to fail".to_string(),
            ));
        }
        Ok(self.now())
    }

    fn resolution_ticks(&self) -> i64 {
        self.resolution
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

/// Build the clock selected by configuration.
#[must_use]
pub fn clock_for(kind: ClockKind) -> Box<dyn WallClock> {
    match kind {
        ClockKind::Precise => Box::new(PreciseClock),
        ClockKind::Coarse => Box::new(CoarseClock),
        ClockKind::System => Box::new(SystemClock),
    }
}

fn system_ticks() -> TickResult<i64> {
    Tick::from_system_time(SystemTime::now())
        .map(Tick::get)
        .map_err(|e| TickError::ClockUnavailable(e.to_string()))
}

/// Rebase a Unix `(seconds, nanoseconds)` reading onto the FILETIME epoch.
#[cfg_attr(not(unix), allow(dead_code))]
fn unix_reading(secs: i64, nanos: u32) -> TickResult<i64> {
    Tick::checked_from_unix_parts(secs, nanos)
        .map(Tick::get)
        .ok_or_else(|| {
            TickError::ClockUnavailable(format!(
                "reading of {secs}s since 1970 is outside the tick range"
            ))
        })
}

#[cfg_attr(not(unix), allow(dead_code))]
fn clock_failure(call: &str, err: &std::io::Error) -> TickError {
    error!(call, %err, "Platform clock read failed");
    TickError::ClockUnavailable(format!("{call} failed: {err}"))
}

#[cfg(unix)]
mod platform {
    use super::{clock_failure, unix_reading, TickError, TickResult};

    pub(super) fn precise_ticks() -> TickResult<i64> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec and CLOCK_REALTIME is always defined.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) };
        if rc != 0 {
            return Err(clock_failure(
                "clock_gettime(CLOCK_REALTIME)",
                &std::io::Error::last_os_error(),
            ));
        }

        let nanos = u32::try_from(ts.tv_nsec).map_err(|_| {
            TickError::ClockUnavailable(format!("clock_gettime returned tv_nsec={}", ts.tv_nsec))
        })?;
        #[allow(clippy::useless_conversion)] // time_t is i32 on some targets
        let secs = i64::from(ts.tv_sec);
        unix_reading(secs, nanos)
    }

    pub(super) fn coarse_ticks() -> TickResult<i64> {
        // SAFETY: a null pointer asks time(2) only for the return value.
        let secs = unsafe { libc::time(std::ptr::null_mut()) };
        if secs == -1 {
            return Err(clock_failure("time", &std::io::Error::last_os_error()));
        }
        #[allow(clippy::useless_conversion)]
        let secs = i64::from(secs);
        unix_reading(secs, 0)
    }
}

#[cfg(windows)]
mod platform {
    use super::{system_ticks, TickError, TickResult, TICKS_PER_SECOND};

    /// 100ns intervals since 1601-01-01, split into two 32-bit halves.
    #[repr(C)]
    struct FileTime {
        low: u32,
        high: u32,
    }

    #[link(name = "kernel32")]
    extern "system" {
        fn GetSystemTimePreciseAsFileTime(lp_system_time_as_file_time: *mut FileTime);
    }

    pub(super) fn precise_ticks() -> TickResult<i64> {
        let mut ft = FileTime { low: 0, high: 0 };
        // SAFETY: `ft` is a valid, writable FILETIME.
        unsafe {
            GetSystemTimePreciseAsFileTime(&mut ft);
        }

        // Already in ticks since 1601; no rebasing needed.
        let raw = (u64::from(ft.high) << 32) | u64::from(ft.low);
        i64::try_from(raw)
            .map_err(|_| TickError::ClockUnavailable(format!("FILETIME {raw} exceeds i64")))
    }

    pub(super) fn coarse_ticks() -> TickResult<i64> {
        let ticks = system_ticks()?;
        Ok(ticks - ticks.rem_euclid(TICKS_PER_SECOND))
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use super::{system_ticks, TickResult, TICKS_PER_SECOND};

    pub(super) fn precise_ticks() -> TickResult<i64> {
        system_ticks()
    }

    pub(super) fn coarse_ticks() -> TickResult<i64> {
        let ticks = system_ticks()?;
        Ok(ticks - ticks.rem_euclid(TICKS_PER_SECOND))
    }
}
