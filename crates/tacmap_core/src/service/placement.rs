//! Marker placement use-case.
//!
//! # Responsibility
//! - Turn a dropped symbol at a screen point into a persisted marker.
//! - Carry the view resolution of the drop into the store's adaptive sizing.
//!
//! # Invariants
//! - Nothing is written when the symbol cannot be resolved.
//! - New markers are never smaller than the smallest marker in the store.

use crate::geometry::transform::{map_units_per_pixel, screen_to_map, ViewState};
use crate::geometry::{MapPoint, ScreenPoint};
use crate::model::marker::{Marker, SymbolRef};
use crate::store::{MarkerStore, StoreResult};
use log::info;

/// Places markers into one store.
pub struct PlacementService<'s> {
    store: &'s MarkerStore,
}

impl<'s> PlacementService<'s> {
    pub fn new(store: &'s MarkerStore) -> Self {
        Self { store }
    }

    /// Handles a completed drop of `symbol` at `pixel`.
    pub fn place_dropped(
        &self,
        symbol: SymbolRef,
        pixel: ScreenPoint,
        view: &ViewState,
    ) -> StoreResult<Marker> {
        let position = screen_to_map(pixel, view);
        self.place_at(symbol, position, map_units_per_pixel(view))
    }

    /// Programmatic placement at a map position.
    pub fn place_at(
        &self,
        symbol: SymbolRef,
        position: MapPoint,
        map_units_per_pixel: f64,
    ) -> StoreResult<Marker> {
        let marker = self.store.create(position, symbol, map_units_per_pixel)?;
        info!(
            "event=marker_place module=placement status=ok id={} size={} map_units_per_pixel={}",
            marker.id, marker.size, map_units_per_pixel
        );
        Ok(marker)
    }

    /// Size a marker placed now at this resolution would get.
    pub fn initial_size(&self, map_units_per_pixel: f64) -> StoreResult<f64> {
        self.store.initial_size(map_units_per_pixel)
    }
}
