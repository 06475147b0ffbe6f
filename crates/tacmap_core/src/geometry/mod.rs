//! Geometry primitives and pure coordinate helpers.
//!
//! # Responsibility
//! - Define map-space and screen-space point types.
//! - Host the pure components used by interactive tools: transforms,
//!   proximity lookup, resize handles and adaptive sizing.
//!
//! # Invariants
//! - Map points are in map units of the store CRS.
//! - Screen points are in pixels with `y` growing downwards.

use serde::{Deserialize, Serialize};

pub mod handles;
pub mod proximity;
pub mod readout;
pub mod sizing;
#[cfg(test)]
pub(crate) mod test_support;
pub mod transform;

/// Point in map units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in map units.
    pub fn distance_to(&self, other: &MapPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Point in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels.
    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl MapRect {
    /// Builds a rectangle, normalising swapped corners.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> MapPoint {
        MapPoint::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &MapPoint) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Grows the rectangle by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MapPoint, MapRect};

    #[test]
    fn rect_normalises_corners_and_contains_edges() {
        let rect = MapRect::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(rect.min_x, 0.0);
        assert_eq!(rect.max_y, 10.0);
        assert!(rect.contains(&MapPoint::new(10.0, 0.0)));
        assert!(!rect.contains(&MapPoint::new(10.1, 0.0)));
        assert_eq!(rect.center(), MapPoint::new(5.0, 5.0));
    }

    #[test]
    fn distance_is_euclidean() {
        let a = MapPoint::new(0.0, 0.0);
        let b = MapPoint::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
