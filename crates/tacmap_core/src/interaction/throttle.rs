//! Time and distance gates for interactive writes and refreshes.
//!
//! # Invariants
//! - Gates are evaluated against event timestamps, never the wall clock.
//! - A gated-out event is dropped; nothing is queued for replay.
//! - The first evaluation after creation or `reset` always passes.

use crate::geometry::MapPoint;

/// Passes at most once per `interval_ms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throttle {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// Whether an event at `now_ms` would pass, without recording it.
    pub fn ready(&self, now_ms: u64) -> bool {
        match self.last_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Records and returns `true` when the event passes.
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        if !self.ready(now_ms) {
            return false;
        }
        self.last_ms = Some(now_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Decides which drag samples become position writes.
///
/// A sample is written when it is the first of the gesture, or when it is
/// farther than `min_distance` from the last written position and at least
/// `min_interval_ms` after the last write.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveWritePolicy {
    min_distance: f64,
    min_interval_ms: u64,
    last_write: Option<(MapPoint, u64)>,
}

impl MoveWritePolicy {
    pub fn new(min_distance: f64, min_interval_ms: u64) -> Self {
        Self {
            min_distance,
            min_interval_ms,
            last_write: None,
        }
    }

    pub fn should_write(&self, position: MapPoint, now_ms: u64) -> bool {
        match self.last_write {
            None => true,
            Some((last_position, last_ms)) => {
                position.distance_to(&last_position) > self.min_distance
                    && now_ms.saturating_sub(last_ms) >= self.min_interval_ms
            }
        }
    }

    pub fn record_write(&mut self, position: MapPoint, now_ms: u64) {
        self.last_write = Some((position, now_ms));
    }

    pub fn last_written(&self) -> Option<MapPoint> {
        self.last_write.map(|(position, _)| position)
    }
}
