//! Core engine for placing and manipulating tactical map markers.
//! This crate is the single source of truth for marker invariants.

pub mod config;
pub mod db;
pub mod geometry;
pub mod interaction;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod symbol_cache;

pub use config::{ConfigError, EngineConfig, InteractionConfig, SizingConfig};
pub use geometry::handles::{HandleCursor, HandleSet, ResizeHandle};
pub use geometry::proximity::{nearest, Tolerance};
pub use geometry::readout::{coordinate_readout, CoordinateReadout, ReadoutValue};
pub use geometry::sizing::adaptive_size;
pub use geometry::transform::{
    map_to_screen, map_units_per_pixel, screen_to_map, to_geodetic, to_utm, CrsId, CrsTransform,
    GeodeticPoint, TransformError, UtmPoint, UtmZone, ViewState,
};
pub use geometry::{MapPoint, MapRect, ScreenPoint};
pub use interaction::{
    Cursor, EngineError, EngineResult, InteractionController, InteractionObserver,
    InteractionState, NoopObserver, PointerButton, PointerEvent,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::marker::{Marker, MarkerId, MarkerPatch, MarkerValidationError, NewMarker, SymbolRef};
pub use repo::marker_repo::{MarkerRepository, RepoError, RepoResult, SqliteMarkerRepository};
pub use service::placement::PlacementService;
pub use store::{
    open_store, open_store_in_memory, store_path_for_project, MarkerStore,
    MigrationReport, StoreChange, StoreError, StoreListener, StoreLocation, StoreResult,
};
pub use symbol_cache::SymbolCache;

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
