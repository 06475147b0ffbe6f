//! Resize handle geometry for the selected marker.
//!
//! # Responsibility
//! - Derive the on-screen bounding box and its eight handles.
//! - Hit-test pointer positions and translate pixel drags into size deltas.
//!
//! # Invariants
//! - Handles are ordered TL, TR, BR, BL, Top, Right, Bottom, Left.
//! - Hit-testing returns the first handle within the radius in that order.

use super::transform::{map_to_screen, map_units_per_pixel, ViewState};
use super::ScreenPoint;
use crate::model::marker::Marker;
use serde::{Deserialize, Serialize};

/// Handle hit radius in pixels.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// One of the eight resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    Top,
    Right,
    Bottom,
    Left,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomRight,
        Self::BottomLeft,
        Self::Top,
        Self::Right,
        Self::Bottom,
        Self::Left,
    ];

    /// Position of this handle in [`Self::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::TopLeft => 0,
            Self::TopRight => 1,
            Self::BottomRight => 2,
            Self::BottomLeft => 3,
            Self::Top => 4,
            Self::Right => 5,
            Self::Bottom => 6,
            Self::Left => 7,
        }
    }

    /// Map-unit size delta for a pixel drag of `(dx, dy)`.
    pub fn size_delta(self, dx: f64, dy: f64, map_units_per_pixel: f64) -> f64 {
        let pixels = match self {
            Self::TopLeft | Self::BottomRight => dx + dy,
            Self::TopRight | Self::BottomLeft => -dx + dy,
            Self::Top | Self::Bottom => dy,
            Self::Left | Self::Right => dx,
        };
        pixels * map_units_per_pixel
    }

    pub fn cursor(self) -> HandleCursor {
        match self {
            Self::TopLeft | Self::BottomRight => HandleCursor::DiagonalForward,
            Self::TopRight | Self::BottomLeft => HandleCursor::DiagonalBackward,
            Self::Top | Self::Bottom => HandleCursor::Vertical,
            Self::Left | Self::Right => HandleCursor::Horizontal,
        }
    }
}

/// Resize cursor shape matching a handle group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleCursor {
    /// `\` diagonal.
    DiagonalForward,
    /// `/` diagonal.
    DiagonalBackward,
    Vertical,
    Horizontal,
}

/// Screen-space square around a marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBox {
    pub left: f64,
    pub top: f64,
    pub side: f64,
}

impl ScreenBox {
    pub fn right(&self) -> f64 {
        self.left + self.side
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.side
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.left + self.side / 2.0, self.top + self.side / 2.0)
    }
}

/// Bounding box plus handle positions for one marker in one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleSet {
    pub bounds: ScreenBox,
    pub handles: [ScreenPoint; 8],
}

impl HandleSet {
    /// Handles for a square of `size` map units centered on `center`.
    pub fn around(center: ScreenPoint, size: f64, map_units_per_pixel: f64) -> Self {
        let side = size / map_units_per_pixel;
        let bounds = ScreenBox {
            left: center.x - side / 2.0,
            top: center.y - side / 2.0,
            side,
        };
        let mid = bounds.center();
        let handles = [
            ScreenPoint::new(bounds.left, bounds.top),
            ScreenPoint::new(bounds.right(), bounds.top),
            ScreenPoint::new(bounds.right(), bounds.bottom()),
            ScreenPoint::new(bounds.left, bounds.bottom()),
            ScreenPoint::new(mid.x, bounds.top),
            ScreenPoint::new(bounds.right(), mid.y),
            ScreenPoint::new(mid.x, bounds.bottom()),
            ScreenPoint::new(bounds.left, mid.y),
        ];
        Self { bounds, handles }
    }

    /// Handles for `marker` as currently seen through `view`.
    pub fn for_marker(marker: &Marker, view: &ViewState) -> Self {
        Self::around(
            map_to_screen(marker.position, view),
            marker.size,
            map_units_per_pixel(view),
        )
    }

    pub fn position(&self, handle: ResizeHandle) -> ScreenPoint {
        self.handles[handle.index()]
    }

    /// First handle within `radius` pixels of `pointer`.
    pub fn hit_test(&self, pointer: ScreenPoint, radius: f64) -> Option<ResizeHandle> {
        ResizeHandle::ALL
            .into_iter()
            .find(|handle| self.position(*handle).distance_to(&pointer) <= radius)
    }
}

/// Clamps an interactive resize result into `[min, max]`.
pub fn resized_size(start_size: f64, delta: f64, min: f64, max: f64) -> f64 {
    (start_size + delta).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::{resized_size, HandleCursor, HandleSet, ResizeHandle, HANDLE_RADIUS_PX};
    use crate::geometry::ScreenPoint;

    #[test]
    fn handles_sit_on_corners_and_midpoints() {
        let set = HandleSet::around(ScreenPoint::new(200.0, 200.0), 50.0, 1.0);
        assert_eq!(
            set.position(ResizeHandle::TopLeft),
            ScreenPoint::new(175.0, 175.0)
        );
        assert_eq!(
            set.position(ResizeHandle::BottomRight),
            ScreenPoint::new(225.0, 225.0)
        );
        assert_eq!(set.position(ResizeHandle::Top), ScreenPoint::new(200.0, 175.0));
        assert_eq!(set.position(ResizeHandle::Left), ScreenPoint::new(175.0, 200.0));
    }

    #[test]
    fn box_side_scales_with_view_resolution() {
        let set = HandleSet::around(ScreenPoint::new(0.0, 0.0), 50.0, 0.5);
        assert_eq!(set.bounds.side, 100.0);
    }

    #[test]
    fn hit_test_uses_inclusive_radius() {
        let set = HandleSet::around(ScreenPoint::new(200.0, 200.0), 50.0, 1.0);
        assert_eq!(
            set.hit_test(ScreenPoint::new(183.0, 175.0), HANDLE_RADIUS_PX),
            Some(ResizeHandle::TopLeft)
        );
        assert_eq!(
            set.hit_test(ScreenPoint::new(200.0, 200.0), HANDLE_RADIUS_PX),
            None
        );
    }

    #[test]
    fn delta_sign_conventions_per_handle_group() {
        assert_eq!(ResizeHandle::TopLeft.size_delta(-10.0, -10.0, 1.0), -20.0);
        assert_eq!(ResizeHandle::BottomRight.size_delta(5.0, 5.0, 2.0), 20.0);
        assert_eq!(ResizeHandle::TopRight.size_delta(10.0, 4.0, 1.0), -6.0);
        assert_eq!(ResizeHandle::Bottom.size_delta(10.0, 4.0, 1.0), 4.0);
        assert_eq!(ResizeHandle::Left.size_delta(10.0, 4.0, 1.0), 10.0);
        assert_eq!(ResizeHandle::Top.cursor(), HandleCursor::Vertical);
    }

    #[test]
    fn resized_size_clamps() {
        assert_eq!(resized_size(50.0, -20.0, 5.0, 500.0), 30.0);
        assert_eq!(resized_size(10.0, -20.0, 5.0, 500.0), 5.0);
        assert_eq!(resized_size(490.0, 20.0, 5.0, 500.0), 500.0);
    }
}
