//! Nearest-marker lookup used by every interactive tool.
//!
//! # Invariants
//! - A candidate hits only when its distance is strictly below its tolerance.
//! - Ties keep the first candidate in iteration order.

use super::{MapPoint, MapRect};
use crate::model::marker::Marker;
use serde::{Deserialize, Serialize};

/// Hit-distance policy in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Tolerance {
    /// Same tolerance for every candidate.
    Fixed(f64),
    /// `max(size * factor, floor)`, so large symbols get larger hit targets.
    SizeScaled { factor: f64, floor: f64 },
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::SizeScaled {
            factor: 0.5,
            floor: 10.0,
        }
    }
}

impl Tolerance {
    /// Tolerance applied to one candidate.
    pub fn for_marker(&self, marker: &Marker) -> f64 {
        match *self {
            Self::Fixed(value) => value,
            Self::SizeScaled { factor, floor } => (marker.size * factor).max(floor),
        }
    }

    /// Largest tolerance any candidate of `max_size` could get; used to pad
    /// the view query rectangle.
    pub fn upper_bound(&self, max_size: f64) -> f64 {
        match *self {
            Self::Fixed(value) => value,
            Self::SizeScaled { factor, floor } => (max_size * factor).max(floor),
        }
    }
}

/// Returns the closest candidate within tolerance of `query`.
///
/// When `query_rect` is set, candidates outside it are skipped before any
/// distance is computed.
pub fn nearest<'a, I>(
    query: MapPoint,
    candidates: I,
    tolerance: Tolerance,
    query_rect: Option<&MapRect>,
) -> Option<&'a Marker>
where
    I: IntoIterator<Item = &'a Marker>,
{
    let mut best: Option<(&'a Marker, f64)> = None;
    for marker in candidates {
        if let Some(rect) = query_rect {
            if !rect.contains(&marker.position) {
                continue;
            }
        }
        let distance = marker.position.distance_to(&query);
        if distance >= tolerance.for_marker(marker) {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((marker, distance)),
        }
    }
    best.map(|(marker, _)| marker)
}
