use std::cell::RefCell;
use std::rc::Rc;
use tacmap_core::interaction::InteractionState;
use tacmap_core::{
    open_store_in_memory, CrsId, CrsTransform, Cursor, EngineConfig, EngineError, HandleCursor,
    HandleSet, InteractionController, InteractionObserver, MapPoint, Marker, MarkerId,
    MarkerPatch, MarkerStore, PointerButton, PointerEvent, ScreenPoint, StoreChange, StoreError,
    StoreListener, SymbolRef, TransformError, ViewState,
};

#[derive(Debug, Clone, PartialEq)]
enum Note {
    Cursor(Cursor),
    Selection(Option<MarkerId>),
    Refreshed(MarkerId),
    ViewRefresh,
    Center(MapPoint),
    Handles(bool),
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Note>>>);

impl Recorder {
    fn notes(&self) -> Vec<Note> {
        self.0.borrow().clone()
    }

    fn count(&self, predicate: impl Fn(&Note) -> bool) -> usize {
        self.0.borrow().iter().filter(|note| predicate(note)).count()
    }

    fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl InteractionObserver for Recorder {
    fn cursor_changed(&self, cursor: Cursor) {
        self.0.borrow_mut().push(Note::Cursor(cursor));
    }

    fn selection_changed(&self, marker: Option<&Marker>) {
        self.0
            .borrow_mut()
            .push(Note::Selection(marker.map(|marker| marker.id)));
    }

    fn marker_refreshed(&self, marker: &Marker) {
        self.0.borrow_mut().push(Note::Refreshed(marker.id));
    }

    fn view_refresh_requested(&self) {
        self.0.borrow_mut().push(Note::ViewRefresh);
    }

    fn view_center_requested(&self, center: MapPoint) {
        self.0.borrow_mut().push(Note::Center(center));
    }

    fn handles_changed(&self, handles: Option<&HandleSet>) {
        self.0.borrow_mut().push(Note::Handles(handles.is_some()));
    }
}

#[derive(Clone, Default)]
struct WriteCounter(Rc<RefCell<usize>>);

impl StoreListener for WriteCounter {
    fn on_change(&self, change: &StoreChange) {
        if matches!(change, StoreChange::Updated(_)) {
            *self.0.borrow_mut() += 1;
        }
    }
}

/// 400x400 px at one map unit per pixel; screen (x, y) is map (x, 400 - y).
fn view() -> ViewState {
    ViewState::centered(MapPoint::new(200.0, 200.0), 1.0, 400, 400)
}

/// Projection that reads map units as degrees divided by a fixed factor.
struct ScaledDegrees(f64);

impl CrsTransform for ScaledDegrees {
    fn transform(
        &self,
        point: MapPoint,
        _source: &CrsId,
        _target: &CrsId,
    ) -> Result<MapPoint, TransformError> {
        Ok(MapPoint::new(point.x / self.0, point.y / self.0))
    }
}

fn store_with_marker(size: f64) -> (MarkerStore, Marker) {
    let store = open_store_in_memory().unwrap();
    let created = store
        .create(MapPoint::new(200.0, 200.0), SymbolRef::inline("<svg/>"), 1.0)
        .unwrap();
    let marker = store.update(created.id, &MarkerPatch::size(size)).unwrap();
    (store, marker)
}

fn controller<'s>(store: &'s MarkerStore, recorder: &Recorder) -> InteractionController<'s> {
    InteractionController::new(store, EngineConfig::default(), Box::new(recorder.clone()))
}

#[test]
fn dense_drag_is_written_at_most_every_interval() {
    let (mut store, marker) = store_with_marker(50.0);
    let writes = WriteCounter::default();
    store.subscribe(Box::new(writes.clone()));
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_pressed(&view, PointerEvent::primary(200.0, 200.0, 0))
        .unwrap();
    assert!(matches!(tool.state(), InteractionState::Moving(_)));
    assert_eq!(tool.cursor(), Cursor::ClosedHand);
    assert_eq!(tool.selection(), Some(marker.id));

    for step in 1..=50u64 {
        let x = 200.0 + step as f64;
        tool.pointer_moved(&view, PointerEvent::primary(x, 200.0, step * 10))
            .unwrap();
    }

    match tool.state() {
        InteractionState::Moving(gesture) => {
            assert_eq!(gesture.writes, 5);
            assert!(gesture.edit_open);
            assert_eq!(gesture.last_written(), Some(MapPoint::new(241.0, 200.0)));
        }
        other => panic!("unexpected state {}", other.name()),
    }
    assert_eq!(*writes.0.borrow(), 5);
    assert_eq!(recorder.count(|note| matches!(note, Note::Refreshed(_))), 2);
    assert_eq!(recorder.count(|note| *note == Note::ViewRefresh), 3);

    tool.pointer_released(&view, PointerEvent::primary(250.0, 200.0, 510))
        .unwrap();
    assert_eq!(*tool.state(), InteractionState::Idle);
    assert_eq!(tool.cursor(), Cursor::PointingHand);
    assert!(!store.in_edit());
    assert_eq!(
        store.get(marker.id).unwrap().unwrap().position,
        MapPoint::new(241.0, 200.0)
    );
}

#[test]
fn sparse_drag_writes_every_sample() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_pressed(&view, PointerEvent::primary(200.0, 200.0, 0))
        .unwrap();
    for step in 1..=4u64 {
        let x = 200.0 + 5.0 * step as f64;
        tool.pointer_moved(&view, PointerEvent::primary(x, 200.0, step * 150))
            .unwrap();
        assert_eq!(
            store.get(marker.id).unwrap().unwrap().position,
            MapPoint::new(x, 200.0)
        );
    }
    tool.pointer_released(&view, PointerEvent::primary(220.0, 200.0, 700))
        .unwrap();
}

#[test]
fn sub_threshold_jitter_is_not_written() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = ViewState::centered(MapPoint::new(200.0, 200.0), 0.01, 400, 400);
    let mut tool = controller(&store, &recorder);

    let center = tacmap_core::map_to_screen(marker.position, &view);
    tool.pointer_pressed(&view, PointerEvent::primary(center.x, center.y, 0))
        .unwrap();
    tool.pointer_moved(&view, PointerEvent::primary(center.x + 1.0, center.y, 10))
        .unwrap();
    // 5 px at 0.01 map units per pixel stays within the 0.1 write distance.
    tool.pointer_moved(&view, PointerEvent::primary(center.x + 6.0, center.y, 500))
        .unwrap();

    match tool.state() {
        InteractionState::Moving(gesture) => assert_eq!(gesture.writes, 1),
        other => panic!("unexpected state {}", other.name()),
    }
    tool.deactivate().unwrap();
}

#[test]
fn corner_handle_drag_resizes_and_clamps() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.identify(&view, ScreenPoint::new(200.0, 200.0)).unwrap();
    assert_eq!(tool.selection(), Some(marker.id));

    tool.pointer_pressed(&view, PointerEvent::primary(175.0, 175.0, 0))
        .unwrap();
    assert!(matches!(tool.state(), InteractionState::Resizing(_)));
    assert_eq!(
        tool.cursor(),
        Cursor::Resize(HandleCursor::DiagonalForward)
    );

    tool.pointer_moved(&view, PointerEvent::primary(165.0, 165.0, 5))
        .unwrap();
    assert_eq!(store.get(marker.id).unwrap().unwrap().size, 30.0);

    tool.pointer_moved(&view, PointerEvent::primary(475.0, 475.0, 10))
        .unwrap();
    assert_eq!(store.get(marker.id).unwrap().unwrap().size, 500.0);

    tool.pointer_moved(&view, PointerEvent::primary(-200.0, -200.0, 15))
        .unwrap();
    assert_eq!(store.get(marker.id).unwrap().unwrap().size, 5.0);

    tool.pointer_released(&view, PointerEvent::primary(-200.0, -200.0, 20))
        .unwrap();
    assert_eq!(*tool.state(), InteractionState::Idle);
    assert_eq!(tool.cursor(), Cursor::Arrow);
    assert!(recorder.count(|note| *note == Note::Handles(true)) >= 4);
}

#[test]
fn edge_handle_uses_single_axis() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.identify(&view, ScreenPoint::new(200.0, 200.0)).unwrap();
    // Right handle sits at (225, 200).
    tool.pointer_pressed(&view, PointerEvent::primary(225.0, 200.0, 0))
        .unwrap();
    assert_eq!(tool.cursor(), Cursor::Resize(HandleCursor::Horizontal));
    tool.pointer_moved(&view, PointerEvent::primary(235.0, 260.0, 5))
        .unwrap();
    tool.pointer_released(&view, PointerEvent::primary(235.0, 260.0, 10))
        .unwrap();

    assert_eq!(store.get(marker.id).unwrap().unwrap().size, 60.0);
}

#[test]
fn empty_press_pans_the_view() {
    let (store, _) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_pressed(&view, PointerEvent::primary(20.0, 20.0, 0))
        .unwrap();
    assert!(matches!(tool.state(), InteractionState::Panning(_)));

    tool.pointer_moved(&view, PointerEvent::primary(30.0, 25.0, 5))
        .unwrap();
    assert_eq!(
        recorder.notes().last(),
        Some(&Note::Center(MapPoint::new(190.0, 205.0)))
    );

    tool.pointer_released(&view, PointerEvent::primary(30.0, 25.0, 10))
        .unwrap();
    assert_eq!(*tool.state(), InteractionState::Idle);
}

#[test]
fn deactivate_commits_pending_move() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_pressed(&view, PointerEvent::primary(200.0, 200.0, 0))
        .unwrap();
    tool.pointer_moved(&view, PointerEvent::primary(210.0, 200.0, 10))
        .unwrap();
    assert!(store.in_edit());

    tool.deactivate().unwrap();
    assert!(!store.in_edit());
    assert_eq!(*tool.state(), InteractionState::Idle);
    assert_eq!(tool.cursor(), Cursor::Arrow);
    assert_eq!(
        store.get(marker.id).unwrap().unwrap().position,
        MapPoint::new(210.0, 200.0)
    );
}

#[test]
fn cancel_restores_move_and_resize() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_pressed(&view, PointerEvent::primary(200.0, 200.0, 0))
        .unwrap();
    tool.pointer_moved(&view, PointerEvent::primary(230.0, 200.0, 10))
        .unwrap();
    tool.cancel(&view).unwrap();
    assert!(!store.in_edit());
    assert_eq!(
        store.get(marker.id).unwrap().unwrap().position,
        MapPoint::new(200.0, 200.0)
    );

    tool.pointer_pressed(&view, PointerEvent::primary(175.0, 175.0, 20))
        .unwrap();
    tool.pointer_moved(&view, PointerEvent::primary(165.0, 165.0, 30))
        .unwrap();
    assert_eq!(store.get(marker.id).unwrap().unwrap().size, 30.0);
    tool.cancel(&view).unwrap();
    assert_eq!(store.get(marker.id).unwrap().unwrap().size, 50.0);
    assert_eq!(*tool.state(), InteractionState::Idle);
}

#[test]
fn cancelled_move_keeps_panel_edits_made_during_the_drag() {
    let (store, moved) = store_with_marker(50.0);
    let other = store
        .create(MapPoint::new(50.0, 50.0), SymbolRef::inline("<svg/>"), 1.0)
        .unwrap();
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_pressed(&view, PointerEvent::primary(200.0, 200.0, 0))
        .unwrap();
    tool.pointer_moved(&view, PointerEvent::primary(230.0, 200.0, 10))
        .unwrap();
    assert!(store.in_edit());

    store
        .update(other.id, &MarkerPatch::label(Some("Alpha".to_string()), true))
        .unwrap();
    tool.cancel(&view).unwrap();

    assert!(!store.in_edit());
    assert_eq!(
        store.get(moved.id).unwrap().unwrap().position,
        MapPoint::new(200.0, 200.0)
    );
    let other = store.get(other.id).unwrap().unwrap();
    assert_eq!(other.label_text.as_deref(), Some("Alpha"));
    assert!(other.label_visible);
    assert!(recorder.count(|note| *note == Note::Refreshed(moved.id)) >= 1);
    assert_eq!(*tool.state(), InteractionState::Idle);
}

#[test]
fn cancel_before_any_write_leaves_marker_untouched() {
    let (mut store, marker) = store_with_marker(50.0);
    let writes = WriteCounter::default();
    store.subscribe(Box::new(writes.clone()));
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_pressed(&view, PointerEvent::primary(200.0, 200.0, 0))
        .unwrap();
    tool.cancel(&view).unwrap();

    assert_eq!(*writes.0.borrow(), 0);
    assert_eq!(store.get(marker.id).unwrap().unwrap(), marker);
    assert_eq!(*tool.state(), InteractionState::Idle);
}

#[test]
fn selected_marker_position_is_reported_in_wgs84() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);
    let source = CrsId::new("EPSG:25832");

    assert_eq!(tool.selected_geodetic(&source, &ScaledDegrees(10.0)).unwrap(), None);

    tool.identify(&view, ScreenPoint::new(200.0, 200.0)).unwrap();
    assert_eq!(tool.selection(), Some(marker.id));
    let geo = tool
        .selected_geodetic(&source, &ScaledDegrees(10.0))
        .unwrap()
        .unwrap();
    assert_eq!((geo.lat, geo.lon), (20.0, 20.0));

    // Unscaled, 200 map units land outside the valid latitude range.
    let err = tool
        .selected_geodetic(&source, &ScaledDegrees(1.0))
        .unwrap_err();
    match err {
        EngineError::Transform(TransformError::TransformFailed { target, .. }) => {
            assert_eq!(target, CrsId::wgs84());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn hover_probe_is_throttled() {
    let (store, _) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_moved(&view, PointerEvent::primary(205.0, 200.0, 0))
        .unwrap();
    assert!(matches!(tool.state(), InteractionState::Hovering { .. }));
    assert_eq!(tool.cursor(), Cursor::PointingHand);

    tool.pointer_moved(&view, PointerEvent::primary(20.0, 20.0, 50))
        .unwrap();
    assert_eq!(tool.cursor(), Cursor::PointingHand);

    tool.pointer_moved(&view, PointerEvent::primary(20.0, 20.0, 100))
        .unwrap();
    assert_eq!(*tool.state(), InteractionState::Idle);
    assert_eq!(tool.cursor(), Cursor::Arrow);
}

#[test]
fn non_primary_press_is_ignored() {
    let (store, _) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    let press = PointerEvent {
        position: ScreenPoint::new(200.0, 200.0),
        button: PointerButton::Secondary,
        timestamp_ms: 0,
    };
    tool.pointer_pressed(&view, press).unwrap();
    assert_eq!(*tool.state(), InteractionState::Idle);
    assert!(recorder.notes().is_empty());
}

#[test]
fn identify_selects_and_clears() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    let hit = tool.identify(&view, ScreenPoint::new(210.0, 195.0)).unwrap();
    assert_eq!(hit.map(|m| m.id), Some(marker.id));
    assert_eq!(
        recorder.notes(),
        vec![Note::Selection(Some(marker.id)), Note::Handles(true)]
    );

    recorder.clear();
    assert!(tool.identify(&view, ScreenPoint::new(20.0, 20.0)).unwrap().is_none());
    assert_eq!(tool.selection(), None);
    assert_eq!(
        recorder.notes(),
        vec![Note::Selection(None), Note::Handles(false)]
    );
}

#[test]
fn failed_write_leaves_controller_idle_without_edit() {
    let (store, marker) = store_with_marker(50.0);
    let recorder = Recorder::default();
    let view = view();
    let mut tool = controller(&store, &recorder);

    tool.pointer_pressed(&view, PointerEvent::primary(200.0, 200.0, 0))
        .unwrap();
    store.delete(marker.id).unwrap();

    let err = tool
        .pointer_moved(&view, PointerEvent::primary(220.0, 200.0, 10))
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::NotFound(id)) if id == marker.id));
    assert_eq!(*tool.state(), InteractionState::Idle);
    assert_eq!(tool.cursor(), Cursor::Arrow);
    assert!(!store.in_edit());
}
