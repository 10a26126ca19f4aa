//! Generator statistics.
//!
//! Counters are collected by the generator itself; this module only holds
//! the serializable snapshot and derived figures.

use crate::time::{ticks_duration, Tick};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Point-in-time view of a generator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorStats {
    /// Ticks handed out.
    pub issued: u64,
    /// Ticks issued by incrementing the previous value because the clock
    /// had not advanced past it.
    pub fallbacks: u64,
    /// Raw clock readings issued directly after one or more fallbacks.
    pub realignments: u64,
    /// Largest distance, in ticks, by which an issued value ran ahead of
    /// the clock reading it was issued against.
    pub max_lead_ticks: u64,
    /// Most recently issued tick (zero before the first call).
    pub last_tick: Tick,
}

impl GeneratorStats {
    /// Fraction of issued ticks that came from the fallback branch.
    ///
    /// Returns `None` before anything was issued.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fallback_ratio(&self) -> Option<f64> {
        if self.issued == 0 {
            None
        } else {
            Some(self.fallbacks as f64 / self.issued as f64)
        }
    }

    /// `max_lead_ticks` as a `Duration`.
    #[must_use]
    pub fn max_lead(&self) -> Duration {
        ticks_duration(self.max_lead_ticks)
    }

    /// Whether any tick was issued ahead of the clock.
    #[must_use]
    pub fn has_run_ahead(&self) -> bool {
        self.fallbacks > 0
    }
}
