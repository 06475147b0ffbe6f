//! Controller states and per-gesture bookkeeping.

use super::throttle::{MoveWritePolicy, Throttle};
use crate::config::InteractionConfig;
use crate::geometry::handles::ResizeHandle;
use crate::geometry::{MapPoint, ScreenPoint};
use crate::model::marker::MarkerId;

/// Mutually exclusive controller modes.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    /// No button held, pointer over a marker.
    Hovering { marker: MarkerId },
    Moving(MoveGesture),
    Resizing(ResizeGesture),
    Panning(PanGesture),
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hovering { .. } => "hovering",
            Self::Moving(_) => "moving",
            Self::Resizing(_) => "resizing",
            Self::Panning(_) => "panning",
        }
    }

    /// Whether a button-held gesture is active.
    pub fn is_gesture(&self) -> bool {
        matches!(self, Self::Moving(_) | Self::Resizing(_) | Self::Panning(_))
    }
}

/// Drag of one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveGesture {
    pub marker: MarkerId,
    pub start_position: MapPoint,
    /// Whether this gesture opened the store edit transaction.
    pub edit_open: bool,
    pub writes: usize,
    pub(crate) write_policy: MoveWritePolicy,
    pub(crate) detail_refresh: Throttle,
    pub(crate) view_refresh: Throttle,
}

impl MoveGesture {
    pub(crate) fn new(marker: MarkerId, start_position: MapPoint, config: &InteractionConfig) -> Self {
        Self {
            marker,
            start_position,
            edit_open: false,
            writes: 0,
            write_policy: MoveWritePolicy::new(
                config.move_write_distance,
                config.move_write_interval_ms,
            ),
            detail_refresh: Throttle::new(config.detail_refresh_interval_ms),
            view_refresh: Throttle::new(config.view_refresh_interval_ms),
        }
    }

    pub fn last_written(&self) -> Option<MapPoint> {
        self.write_policy.last_written()
    }
}

/// Drag of one resize handle of the selected marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeGesture {
    pub marker: MarkerId,
    pub handle: ResizeHandle,
    pub press: ScreenPoint,
    pub start_size: f64,
    pub current_size: f64,
}

/// View drag over empty map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanGesture {
    pub press: ScreenPoint,
    pub start_center: MapPoint,
    pub current_center: MapPoint,
}
