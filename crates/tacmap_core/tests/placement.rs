use tacmap_core::{
    open_store_in_memory, MapPoint, MarkerPatch, PlacementService, ScreenPoint, StoreError,
    SymbolRef, ViewState,
};

const SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\"><rect width=\"8\" height=\"8\"/></svg>";

#[test]
fn dropped_symbol_gets_adaptive_size_at_drop_point() {
    let dir = tempfile::tempdir().unwrap();
    let symbol_path = dir.path().join("Bergung.svg");
    std::fs::write(&symbol_path, SVG).unwrap();

    let store = open_store_in_memory().unwrap();
    let placement = PlacementService::new(&store);
    let view = ViewState::centered(MapPoint::new(0.0, 0.0), 0.5, 400, 400);

    let marker = placement
        .place_dropped(
            SymbolRef::from_path(symbol_path.to_str().unwrap()),
            ScreenPoint::new(200.0, 200.0),
            &view,
        )
        .unwrap();

    assert_eq!(marker.size, 60.0);
    assert_eq!(marker.position, MapPoint::new(0.0, 0.0));
    assert_eq!(marker.name, "Bergung.svg");
    assert_eq!(marker.symbol.content.as_deref(), Some(SVG));
    assert!(!marker.scale_with_view);
    assert!(!marker.label_visible);
    assert_eq!(store.list().unwrap().count(), 1);
}

#[test]
fn new_marker_is_not_smaller_than_existing_ones() {
    let store = open_store_in_memory().unwrap();
    let existing = store
        .create(MapPoint::new(0.0, 0.0), SymbolRef::inline(SVG), 1.0)
        .unwrap();
    store
        .update(existing.id, &MarkerPatch::size(80.0))
        .unwrap();
    let placement = PlacementService::new(&store);

    assert_eq!(placement.initial_size(0.5).unwrap(), 80.0);
    assert_eq!(placement.initial_size(0.1).unwrap(), 200.0);

    let marker = placement
        .place_at(SymbolRef::inline(SVG), MapPoint::new(5.0, 5.0), 0.5)
        .unwrap();
    assert_eq!(marker.size, 80.0);
}

#[test]
fn zoomed_out_placement_hits_the_lower_bound() {
    let store = open_store_in_memory().unwrap();
    let placement = PlacementService::new(&store);
    assert_eq!(placement.initial_size(50.0).unwrap(), 10.0);
}

#[test]
fn unreadable_symbol_places_nothing() {
    let store = open_store_in_memory().unwrap();
    let placement = PlacementService::new(&store);
    let view = ViewState::centered(MapPoint::new(0.0, 0.0), 1.0, 200, 200);

    let err = placement
        .place_dropped(
            SymbolRef::from_path("/no/such/library/Zugtrupp.svg"),
            ScreenPoint::new(10.0, 10.0),
            &view,
        )
        .unwrap_err();

    assert!(matches!(err, StoreError::ResourceUnavailable { .. }));
    assert_eq!(store.list().unwrap().count(), 0);
}
