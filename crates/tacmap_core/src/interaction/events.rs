//! Pointer input and observer output of the interaction controller.

use crate::geometry::handles::{HandleCursor, HandleSet};
use crate::geometry::{MapPoint, ScreenPoint};
use crate::model::marker::Marker;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// One pointer sample delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub position: ScreenPoint,
    pub button: PointerButton,
    /// Monotonic host timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl PointerEvent {
    pub fn primary(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            position: ScreenPoint::new(x, y),
            button: PointerButton::Primary,
            timestamp_ms,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.button == PointerButton::Primary
    }
}

/// Cursor shape requested from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cursor {
    Arrow,
    /// Over a marker that can be grabbed.
    PointingHand,
    /// While dragging a marker.
    ClosedHand,
    Resize(HandleCursor),
}

/// One-way notifications from the controller to panels and the host view.
///
/// Implementors must not call back into the controller. Edits go through the
/// marker store.
pub trait InteractionObserver {
    fn cursor_changed(&self, _cursor: Cursor) {}

    /// Selected marker snapshot, `None` when the selection was cleared.
    fn selection_changed(&self, _marker: Option<&Marker>) {}

    /// Fresh snapshot of the marker shown in the detail panel.
    fn marker_refreshed(&self, _marker: &Marker) {}

    fn view_refresh_requested(&self) {}

    /// Host should re-center the view on `center`, keeping the scale.
    fn view_center_requested(&self, _center: MapPoint) {}

    /// Resize handles of the selected marker, `None` to hide them.
    fn handles_changed(&self, _handles: Option<&HandleSet>) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl InteractionObserver for NoopObserver {}
