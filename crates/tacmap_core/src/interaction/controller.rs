//! Modal pointer controller for hover, move, resize and pan.
//!
//! # Responsibility
//! - Turn pointer samples into marker writes and view requests.
//! - Keep store writes bounded by the move commit policy.
//! - Report cursor, selection and refresh needs to one observer.
//!
//! # Invariants
//! - At most one gesture is active; a new press is ignored until release.
//! - Move writes share one lazily opened edit transaction per gesture.
//! - Every exit from a move gesture commits the edit it opened. `cancel`
//!   then writes the start position back, so writes from other callers made
//!   during the gesture survive.
//! - After a store failure the controller is `Idle` with no open edit.

use super::events::{Cursor, InteractionObserver, PointerEvent};
use super::state::{InteractionState, MoveGesture, PanGesture, ResizeGesture};
use super::throttle::Throttle;
use crate::config::EngineConfig;
use crate::geometry::handles::{resized_size, HandleSet, ResizeHandle};
use crate::geometry::proximity::nearest;
use crate::geometry::transform::{
    map_units_per_pixel, screen_to_map, to_geodetic, CrsId, CrsTransform, GeodeticPoint,
    TransformError, ViewState,
};
use crate::geometry::{MapPoint, ScreenPoint};
use crate::model::marker::{Marker, MarkerId, MarkerPatch};
use crate::store::{MarkerStore, StoreError, StoreResult};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::mem;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failure surfaced by the interaction layer.
#[derive(Debug)]
pub enum EngineError {
    Store(StoreError),
    Transform(TransformError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Transform(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Transform(err) => Some(err),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<TransformError> for EngineError {
    fn from(value: TransformError) -> Self {
        Self::Transform(value)
    }
}

/// Pointer state machine bound to one marker store.
pub struct InteractionController<'s> {
    store: &'s MarkerStore,
    config: EngineConfig,
    observer: Box<dyn InteractionObserver + 's>,
    state: InteractionState,
    selection: Option<MarkerId>,
    cursor: Cursor,
    hover_probe: Throttle,
}

impl<'s> InteractionController<'s> {
    pub fn new(
        store: &'s MarkerStore,
        config: EngineConfig,
        observer: Box<dyn InteractionObserver + 's>,
    ) -> Self {
        let hover_probe = Throttle::new(config.interaction.hover_probe_interval_ms);
        Self {
            store,
            config,
            observer,
            state: InteractionState::Idle,
            selection: None,
            cursor: Cursor::Arrow,
            hover_probe,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn selection(&self) -> Option<MarkerId> {
        self.selection
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current snapshot of the selected marker.
    pub fn selected_marker(&self) -> EngineResult<Option<Marker>> {
        match self.selection {
            Some(id) => Ok(self.store.get(id)?),
            None => Ok(None),
        }
    }

    /// WGS84 position of the selected marker for the detail panel.
    pub fn selected_geodetic(
        &self,
        source: &CrsId,
        service: &dyn CrsTransform,
    ) -> EngineResult<Option<GeodeticPoint>> {
        match self.selected_marker()? {
            Some(marker) => Ok(Some(to_geodetic(marker.position, source, service)?)),
            None => Ok(None),
        }
    }

    /// Select-tool click: selects the nearest marker or clears the selection.
    pub fn identify(&mut self, view: &ViewState, pixel: ScreenPoint) -> EngineResult<Option<Marker>> {
        let hit = self.hit_test(view, pixel)?;
        match &hit {
            Some(marker) => self.select(marker, view),
            None => self.clear_selection(),
        }
        Ok(hit)
    }

    pub fn pointer_pressed(&mut self, view: &ViewState, event: PointerEvent) -> EngineResult<()> {
        if !event.is_primary() || self.state.is_gesture() {
            return Ok(());
        }

        if let Some((marker, handle)) = self.selected_handle_at(view, event.position)? {
            debug!(
                "event=resize_start module=interaction status=ok id={} handle={}",
                marker.id,
                handle.index()
            );
            self.state = InteractionState::Resizing(ResizeGesture {
                marker: marker.id,
                handle,
                press: event.position,
                start_size: marker.size,
                current_size: marker.size,
            });
            self.set_cursor(Cursor::Resize(handle.cursor()));
            return Ok(());
        }

        match self.hit_test(view, event.position)? {
            Some(marker) => {
                debug!(
                    "event=move_start module=interaction status=ok id={}",
                    marker.id
                );
                self.state = InteractionState::Moving(MoveGesture::new(
                    marker.id,
                    marker.position,
                    &self.config.interaction,
                ));
                self.set_cursor(Cursor::ClosedHand);
                self.select(&marker, view);
            }
            None => {
                let center = view.center();
                self.state = InteractionState::Panning(PanGesture {
                    press: event.position,
                    start_center: center,
                    current_center: center,
                });
            }
        }
        Ok(())
    }

    pub fn pointer_moved(&mut self, view: &ViewState, event: PointerEvent) -> EngineResult<()> {
        match mem::replace(&mut self.state, InteractionState::Idle) {
            state @ (InteractionState::Idle | InteractionState::Hovering { .. }) => {
                self.state = state;
                self.probe_hover(view, event)
            }
            InteractionState::Moving(gesture) => self.drag_marker(view, event, gesture),
            InteractionState::Resizing(gesture) => self.drag_handle(view, event, gesture),
            InteractionState::Panning(gesture) => {
                self.drag_view(view, event, gesture);
                Ok(())
            }
        }
    }

    pub fn pointer_released(&mut self, view: &ViewState, event: PointerEvent) -> EngineResult<()> {
        if !event.is_primary() {
            return Ok(());
        }

        match mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::Moving(gesture) => {
                let closed = self.close_edit(&gesture);
                self.set_cursor(Cursor::PointingHand);
                info!(
                    "event=move_end module=interaction status={} id={} writes={}",
                    if closed.is_ok() { "ok" } else { "error" },
                    gesture.marker,
                    gesture.writes
                );
                closed?;
                if let Some(marker) = self.store.get(gesture.marker)? {
                    self.observer.marker_refreshed(&marker);
                    if self.selection == Some(marker.id) {
                        self.observer
                            .handles_changed(Some(&HandleSet::for_marker(&marker, view)));
                    }
                }
                self.observer.view_refresh_requested();
            }
            InteractionState::Resizing(gesture) => {
                info!(
                    "event=resize_end module=interaction status=ok id={} size={}",
                    gesture.marker, gesture.current_size
                );
                self.set_cursor(Cursor::Arrow);
            }
            InteractionState::Panning(_) => {}
            other => self.state = other,
        }
        Ok(())
    }

    /// Tool switched away: ends any gesture, keeping writes made so far.
    pub fn deactivate(&mut self) -> EngineResult<()> {
        let state = mem::replace(&mut self.state, InteractionState::Idle);
        let closed = match &state {
            InteractionState::Moving(gesture) => self.close_edit(gesture),
            _ => Ok(()),
        };
        self.hover_probe.reset();
        self.set_cursor(Cursor::Arrow);
        info!(
            "event=tool_deactivate module=interaction status={} from_state={}",
            if closed.is_ok() { "ok" } else { "error" },
            state.name()
        );
        closed.map_err(EngineError::from)
    }

    /// Aborts the active gesture and restores what it changed.
    pub fn cancel(&mut self, view: &ViewState) -> EngineResult<()> {
        let state = mem::replace(&mut self.state, InteractionState::Idle);
        let name = state.name();
        let result = match state {
            InteractionState::Moving(gesture) => self.cancel_move(&gesture),
            InteractionState::Resizing(gesture) => self.cancel_resize(&gesture, view),
            InteractionState::Panning(gesture) => {
                self.observer.view_center_requested(gesture.start_center);
                Ok(())
            }
            other => {
                self.state = other;
                return Ok(());
            }
        };
        self.set_cursor(Cursor::Arrow);
        debug!(
            "event=gesture_cancel module=interaction status={} from_state={name}",
            if result.is_ok() { "ok" } else { "error" }
        );
        result
    }

    fn probe_hover(&mut self, view: &ViewState, event: PointerEvent) -> EngineResult<()> {
        if let Some((_, handle)) = self.selected_handle_at(view, event.position)? {
            self.set_cursor(Cursor::Resize(handle.cursor()));
            return Ok(());
        }
        if !self.hover_probe.try_fire(event.timestamp_ms) {
            return Ok(());
        }
        match self.hit_test(view, event.position)? {
            Some(marker) => {
                self.state = InteractionState::Hovering { marker: marker.id };
                self.set_cursor(Cursor::PointingHand);
            }
            None => {
                self.state = InteractionState::Idle;
                self.set_cursor(Cursor::Arrow);
            }
        }
        Ok(())
    }

    fn drag_marker(
        &mut self,
        view: &ViewState,
        event: PointerEvent,
        mut gesture: MoveGesture,
    ) -> EngineResult<()> {
        let position = screen_to_map(event.position, view);
        if !gesture.write_policy.should_write(position, event.timestamp_ms) {
            self.state = InteractionState::Moving(gesture);
            return Ok(());
        }

        if !gesture.edit_open {
            if let Err(err) = self.store.begin_edit() {
                warn!(
                    "event=move_write module=interaction status=error id={} error={err}",
                    gesture.marker
                );
                self.set_cursor(Cursor::Arrow);
                return Err(err.into());
            }
            gesture.edit_open = true;
        }

        match self
            .store
            .update(gesture.marker, &MarkerPatch::position(position))
        {
            Ok(marker) => {
                gesture
                    .write_policy
                    .record_write(position, event.timestamp_ms);
                gesture.writes += 1;
                if gesture.detail_refresh.try_fire(event.timestamp_ms) {
                    self.observer.marker_refreshed(&marker);
                }
                if gesture.view_refresh.try_fire(event.timestamp_ms) {
                    self.observer.view_refresh_requested();
                }
                self.state = InteractionState::Moving(gesture);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=move_write module=interaction status=error id={} error={err}",
                    gesture.marker
                );
                let _ = self.close_edit(&gesture);
                self.set_cursor(Cursor::Arrow);
                Err(err.into())
            }
        }
    }

    fn drag_handle(
        &mut self,
        view: &ViewState,
        event: PointerEvent,
        mut gesture: ResizeGesture,
    ) -> EngineResult<()> {
        let limits = &self.config.interaction;
        let dx = event.position.x - gesture.press.x;
        let dy = event.position.y - gesture.press.y;
        let delta = gesture
            .handle
            .size_delta(dx, dy, map_units_per_pixel(view));
        let size = resized_size(gesture.start_size, delta, limits.resize_min, limits.resize_max);
        if size == gesture.current_size {
            self.state = InteractionState::Resizing(gesture);
            return Ok(());
        }

        match self.store.update(gesture.marker, &MarkerPatch::size(size)) {
            Ok(marker) => {
                gesture.current_size = size;
                self.observer
                    .handles_changed(Some(&HandleSet::for_marker(&marker, view)));
                self.observer.marker_refreshed(&marker);
                self.observer.view_refresh_requested();
                self.state = InteractionState::Resizing(gesture);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=resize_write module=interaction status=error id={} error={err}",
                    gesture.marker
                );
                self.set_cursor(Cursor::Arrow);
                Err(err.into())
            }
        }
    }

    fn drag_view(&mut self, view: &ViewState, event: PointerEvent, mut gesture: PanGesture) {
        let map_units_per_pixel = map_units_per_pixel(view);
        let dx = event.position.x - gesture.press.x;
        let dy = event.position.y - gesture.press.y;
        let center = MapPoint::new(
            gesture.start_center.x - dx * map_units_per_pixel,
            gesture.start_center.y + dy * map_units_per_pixel,
        );
        gesture.current_center = center;
        self.observer.view_center_requested(center);
        self.state = InteractionState::Panning(gesture);
    }

    fn cancel_move(&mut self, gesture: &MoveGesture) -> EngineResult<()> {
        self.close_edit(gesture)?;
        let restored = if gesture.edit_open {
            match self
                .store
                .update(gesture.marker, &MarkerPatch::position(gesture.start_position))
            {
                Ok(marker) => Some(marker),
                Err(StoreError::NotFound(_)) => None,
                Err(err) => return Err(err.into()),
            }
        } else {
            self.store.get(gesture.marker)?
        };
        if let Some(marker) = restored {
            self.observer.marker_refreshed(&marker);
        }
        self.observer.view_refresh_requested();
        Ok(())
    }

    fn cancel_resize(&mut self, gesture: &ResizeGesture, view: &ViewState) -> EngineResult<()> {
        let marker = self
            .store
            .update(gesture.marker, &MarkerPatch::size(gesture.start_size))?;
        self.observer
            .handles_changed(Some(&HandleSet::for_marker(&marker, view)));
        self.observer.marker_refreshed(&marker);
        self.observer.view_refresh_requested();
        Ok(())
    }

    /// Commits the gesture's edit; a failed commit is rolled back so no edit
    /// stays open.
    fn close_edit(&self, gesture: &MoveGesture) -> StoreResult<()> {
        if !gesture.edit_open || !self.store.in_edit() {
            return Ok(());
        }
        match self.store.commit_edit() {
            Ok(()) => Ok(()),
            Err(err) => {
                if self.store.in_edit() {
                    let _ = self.store.rollback_edit();
                }
                Err(err)
            }
        }
    }

    fn hit_test(&self, view: &ViewState, pixel: ScreenPoint) -> EngineResult<Option<Marker>> {
        let query = screen_to_map(pixel, view);
        let markers = self.store.list()?.collect::<Vec<_>>();
        let max_size = markers
            .iter()
            .map(|marker| marker.size)
            .fold(0.0_f64, f64::max);
        let query_rect = view
            .extent
            .expanded(self.config.tolerance.upper_bound(max_size));
        Ok(nearest(query, &markers, self.config.tolerance, Some(&query_rect)).cloned())
    }

    fn selected_handle_at(
        &mut self,
        view: &ViewState,
        pixel: ScreenPoint,
    ) -> EngineResult<Option<(Marker, ResizeHandle)>> {
        let Some(id) = self.selection else {
            return Ok(None);
        };
        let Some(marker) = self.store.get(id)? else {
            self.clear_selection();
            return Ok(None);
        };
        let handle = HandleSet::for_marker(&marker, view)
            .hit_test(pixel, self.config.interaction.handle_radius_px);
        Ok(handle.map(|handle| (marker, handle)))
    }

    fn select(&mut self, marker: &Marker, view: &ViewState) {
        self.selection = Some(marker.id);
        self.observer.selection_changed(Some(marker));
        self.observer
            .handles_changed(Some(&HandleSet::for_marker(marker, view)));
    }

    fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            self.observer.selection_changed(None);
            self.observer.handles_changed(None);
        }
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        if self.cursor != cursor {
            self.cursor = cursor;
            self.observer.cursor_changed(cursor);
        }
    }
}
