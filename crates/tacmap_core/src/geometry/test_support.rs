//! Projection stand-ins for unit tests.

use super::transform::{CrsId, CrsTransform, TransformError, WEB_MERCATOR, WGS84};
use super::MapPoint;
use std::f64::consts::PI;

const EARTH_RADIUS_M: f64 = 6_378_137.0;
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Spherical (web) mercator <-> WGS84 service.
///
/// Supports `EPSG:3857` and `EPSG:4326` only; every other pair fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMercator;

impl CrsTransform for SphericalMercator {
    fn transform(
        &self,
        point: MapPoint,
        source: &CrsId,
        target: &CrsId,
    ) -> Result<MapPoint, TransformError> {
        match (source.as_str(), target.as_str()) {
            (s, t) if s == t && (s == WGS84 || s == WEB_MERCATOR) => Ok(point),
            (WEB_MERCATOR, WGS84) => {
                let lon = point.x / EARTH_RADIUS_M * 180.0 / PI;
                let lat = (2.0 * (point.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0) * 180.0 / PI;
                Ok(MapPoint::new(lon, lat))
            }
            (WGS84, WEB_MERCATOR) => {
                if point.y.abs() > MERCATOR_MAX_LAT {
                    return Err(TransformError::failed(
                        source,
                        target,
                        format!("latitude {} outside mercator range", point.y),
                    ));
                }
                let x = point.x * PI / 180.0 * EARTH_RADIUS_M;
                let y = (PI / 4.0 + point.y * PI / 360.0).tan().ln() * EARTH_RADIUS_M;
                Ok(MapPoint::new(x, y))
            }
            _ => Err(TransformError::failed(source, target, "unsupported crs pair")),
        }
    }
}
