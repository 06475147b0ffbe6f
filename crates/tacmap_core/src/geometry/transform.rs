//! Screen/map/geographic coordinate adapter.
//!
//! # Responsibility
//! - Convert between screen pixels and map units for the current view.
//! - Wrap an external CRS service for geodetic and UTM projections.
//!
//! # Invariants
//! - Screen/map conversions are pure functions of `ViewState`.
//! - CRS failures surface as `TransformError`, never as partial or zeroed data.

use super::{MapPoint, MapRect, ScreenPoint};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Snapshot of the map view as seen by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Visible map extent.
    pub extent: MapRect,
    /// Canvas width in pixels.
    pub width_px: u32,
    /// Canvas height in pixels.
    pub height_px: u32,
}

impl ViewState {
    pub fn new(extent: MapRect, width_px: u32, height_px: u32) -> Self {
        Self {
            extent,
            width_px,
            height_px,
        }
    }

    /// View of `width_px` x `height_px` pixels centered on `center`.
    pub fn centered(
        center: MapPoint,
        map_units_per_pixel: f64,
        width_px: u32,
        height_px: u32,
    ) -> Self {
        let half_w = f64::from(width_px) * map_units_per_pixel / 2.0;
        let half_h = f64::from(height_px) * map_units_per_pixel / 2.0;
        Self::new(
            MapRect::new(
                center.x - half_w,
                center.y - half_h,
                center.x + half_w,
                center.y + half_h,
            ),
            width_px,
            height_px,
        )
    }

    pub fn center(&self) -> MapPoint {
        self.extent.center()
    }

    /// Same scale and canvas size, recentered.
    pub fn with_center(&self, center: MapPoint) -> Self {
        Self::centered(
            center,
            map_units_per_pixel(self),
            self.width_px,
            self.height_px,
        )
    }
}

/// Map units covered by one screen pixel.
pub fn map_units_per_pixel(view: &ViewState) -> f64 {
    view.extent.width() / f64::from(view.width_px.max(1))
}

/// Converts a canvas pixel into map coordinates.
pub fn screen_to_map(pixel: ScreenPoint, view: &ViewState) -> MapPoint {
    let mupp = map_units_per_pixel(view);
    MapPoint::new(
        view.extent.min_x + pixel.x * mupp,
        view.extent.max_y - pixel.y * mupp,
    )
}

/// Inverse of [`screen_to_map`].
pub fn map_to_screen(point: MapPoint, view: &ViewState) -> ScreenPoint {
    let mupp = map_units_per_pixel(view);
    ScreenPoint::new(
        (point.x - view.extent.min_x) / mupp,
        (view.extent.max_y - point.y) / mupp,
    )
}

/// Coordinate reference system authority id, e.g. `EPSG:4326`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrsId(pub String);

impl CrsId {
    pub fn new(auth_id: impl Into<String>) -> Self {
        Self(auth_id.into())
    }

    pub fn wgs84() -> Self {
        Self::new(WGS84)
    }

    pub fn web_mercator() -> Self {
        Self::new(WEB_MERCATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CrsId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const WGS84: &str = "EPSG:4326";
pub const WEB_MERCATOR: &str = "EPSG:3857";

/// External CRS service boundary.
pub trait CrsTransform {
    fn transform(
        &self,
        point: MapPoint,
        source: &CrsId,
        target: &CrsId,
    ) -> Result<MapPoint, TransformError>;
}

/// Failure of a CRS conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    TransformFailed {
        source: CrsId,
        target: CrsId,
        reason: String,
    },
}

impl TransformError {
    pub fn failed(source: &CrsId, target: &CrsId, reason: impl Into<String>) -> Self {
        Self::TransformFailed {
            source: source.clone(),
            target: target.clone(),
            reason: reason.into(),
        }
    }
}

impl Display for TransformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransformFailed {
                source,
                target,
                reason,
            } => write!(f, "transform {source} -> {target} failed: {reason}"),
        }
    }
}

impl Error for TransformError {}

/// WGS84 latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub lat: f64,
    pub lon: f64,
}

/// UTM zone selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmZone {
    pub number: u8,
    pub north: bool,
}

impl UtmZone {
    pub const fn north(number: u8) -> Self {
        Self {
            number,
            north: true,
        }
    }

    /// WGS84 / UTM EPSG code (`326xx` north, `327xx` south).
    pub fn crs(&self) -> CrsId {
        let base = if self.north { 32600 } else { 32700 };
        CrsId::new(format!("EPSG:{}", base + u32::from(self.number)))
    }
}

impl Display for UtmZone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.number, if self.north { 'N' } else { 'S' })
    }
}

/// Projected UTM coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtmPoint {
    pub zone: UtmZone,
    pub easting: f64,
    pub northing: f64,
}

/// Converts a map point to WGS84 latitude/longitude.
pub fn to_geodetic(
    point: MapPoint,
    source: &CrsId,
    service: &dyn CrsTransform,
) -> Result<GeodeticPoint, TransformError> {
    let target = CrsId::wgs84();
    let projected = checked_transform(point, source, &target, service)?;
    if projected.y.abs() > 90.0 || projected.x.abs() > 180.0 {
        return Err(TransformError::failed(
            source,
            &target,
            format!("result out of range: {}, {}", projected.y, projected.x),
        ));
    }
    Ok(GeodeticPoint {
        lat: projected.y,
        lon: projected.x,
    })
}

/// Projects a map point into the given UTM zone.
pub fn to_utm(
    point: MapPoint,
    source: &CrsId,
    zone: UtmZone,
    service: &dyn CrsTransform,
) -> Result<UtmPoint, TransformError> {
    let projected = checked_transform(point, source, &zone.crs(), service)?;
    Ok(UtmPoint {
        zone,
        easting: projected.x,
        northing: projected.y,
    })
}

fn checked_transform(
    point: MapPoint,
    source: &CrsId,
    target: &CrsId,
    service: &dyn CrsTransform,
) -> Result<MapPoint, TransformError> {
    let projected = service.transform(point, source, target)?;
    if !projected.is_finite() {
        return Err(TransformError::failed(source, target, "non-finite result"));
    }
    Ok(projected)
}
