//! Coordinate readout strings for the detail panel.
//!
//! # Responsibility
//! - Format a marker position as DMS, decimal WGS84, UTM and a simplified
//!   grid reference.
//!
//! # Invariants
//! - Every entry fails independently; a failed entry shows [`UNAVAILABLE`]
//!   and never a stale or zero coordinate.

use super::transform::{
    to_geodetic, to_utm, CrsId, CrsTransform, GeodeticPoint, TransformError, UtmPoint, UtmZone,
};
use super::MapPoint;
use std::fmt::{Display, Formatter};

/// Text shown in place of a coordinate that could not be computed.
pub const UNAVAILABLE: &str = "unavailable";

const LATITUDE_BANDS: &[u8] = b"CDEFGHJKLMNPQRSTUVWX";

/// One readout line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadoutValue {
    Available(String),
    Unavailable(TransformError),
}

impl ReadoutValue {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Available(text) => text,
            Self::Unavailable(_) => UNAVAILABLE,
        }
    }
}

impl Display for ReadoutValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// All readout lines for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateReadout {
    pub lat_lon_dms: ReadoutValue,
    pub wgs84_decimal: ReadoutValue,
    pub utm: ReadoutValue,
    pub grid_ref: ReadoutValue,
}

impl CoordinateReadout {
    /// Label/value pairs in display order.
    pub fn lines(&self) -> [(&'static str, &ReadoutValue); 4] {
        [
            ("Lat/Lon", &self.lat_lon_dms),
            ("WGS84", &self.wgs84_decimal),
            ("UTM", &self.utm),
            ("Grid", &self.grid_ref),
        ]
    }
}

/// Builds the readout for `point` given in `source`.
pub fn coordinate_readout(
    point: MapPoint,
    source: &CrsId,
    zone: UtmZone,
    service: &dyn CrsTransform,
) -> CoordinateReadout {
    let geodetic = to_geodetic(point, source, service);
    let utm = to_utm(point, source, zone, service);

    let grid_ref = match (&geodetic, &utm) {
        (Ok(geodetic), Ok(utm)) => match latitude_band(geodetic.lat) {
            Some(band) => ReadoutValue::Available(format_grid_ref(utm, band)),
            None => ReadoutValue::Unavailable(TransformError::failed(
                source,
                &zone.crs(),
                format!("latitude {} outside grid bands", geodetic.lat),
            )),
        },
        (Err(err), _) | (_, Err(err)) => ReadoutValue::Unavailable(err.clone()),
    };

    CoordinateReadout {
        lat_lon_dms: map_value(&geodetic, format_lat_lon_dms),
        wgs84_decimal: map_value(&geodetic, format_decimal),
        utm: map_value(&utm, format_utm),
        grid_ref,
    }
}

fn map_value<T>(
    result: &Result<T, TransformError>,
    format: impl FnOnce(&T) -> String,
) -> ReadoutValue {
    match result {
        Ok(value) => ReadoutValue::Available(format(value)),
        Err(err) => ReadoutValue::Unavailable(err.clone()),
    }
}

/// `52°31'12.00"N 13°24'18.00"E`
pub fn format_lat_lon_dms(point: &GeodeticPoint) -> String {
    format!(
        "{} {}",
        format_dms(point.lat, 'N', 'S'),
        format_dms(point.lon, 'E', 'W')
    )
}

/// Degrees, minutes and seconds rounded to hundredths of a second.
pub fn format_dms(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value >= 0.0 { positive } else { negative };
    let hundredths = (value.abs() * 360_000.0).round() as u64;
    let degrees = hundredths / 360_000;
    let minutes = (hundredths % 360_000) / 6_000;
    let seconds = (hundredths % 6_000) as f64 / 100.0;
    format!("{degrees}°{minutes:02}'{seconds:05.2}\"{hemisphere}")
}

/// `52.520000, 13.405000`
pub fn format_decimal(point: &GeodeticPoint) -> String {
    format!("{:.6}, {:.6}", point.lat, point.lon)
}

/// `32N 389012E 5819123N`, truncated to whole meters.
pub fn format_utm(point: &UtmPoint) -> String {
    format!(
        "{} {}E {}N",
        point.zone,
        point.easting.trunc() as i64,
        point.northing.trunc() as i64
    )
}

/// Simplified grid reference: zone and band, one digit each of the 100 km
/// easting and northing squares, then the 5-digit remainders.
pub fn format_grid_ref(point: &UtmPoint, band: char) -> String {
    let easting = point.easting.trunc() as i64;
    let northing = point.northing.trunc() as i64;
    format!(
        "{}{band} {}{} {:05} {:05}",
        point.zone.number,
        (easting / 100_000) % 10,
        (northing / 100_000) % 10,
        easting.rem_euclid(100_000),
        northing.rem_euclid(100_000)
    )
}

/// Latitude band letter, `None` outside 80°S..84°N.
pub fn latitude_band(lat: f64) -> Option<char> {
    if !(-80.0..=84.0).contains(&lat) {
        return None;
    }
    let index = (((lat + 80.0) / 8.0).floor() as usize).min(LATITUDE_BANDS.len() - 1);
    LATITUDE_BANDS.get(index).map(|band| char::from(*band))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::test_support::SphericalMercator;
    use crate::geometry::transform::WGS84;

    /// Test service mapping WGS84 to one fixed UTM point.
    struct FixedUtm;

    impl CrsTransform for FixedUtm {
        fn transform(
            &self,
            point: MapPoint,
            source: &CrsId,
            target: &CrsId,
        ) -> Result<MapPoint, TransformError> {
            match target.as_str() {
                WGS84 => Ok(point),
                "EPSG:32632" => Ok(MapPoint::new(389_012.7, 5_819_123.9)),
                _ => Err(TransformError::failed(source, target, "unsupported")),
            }
        }
    }

    #[test]
    fn dms_carries_rounded_seconds() {
        assert_eq!(format_dms(52.52, 'N', 'S'), "52°31'12.00\"N");
        assert_eq!(format_dms(-13.405, 'E', 'W'), "13°24'18.00\"W");
        assert_eq!(format_dms(9.999_999_9, 'E', 'W'), "10°00'00.00\"E");
    }

    #[test]
    fn grid_reference_uses_100km_squares() {
        let point = UtmPoint {
            zone: UtmZone::north(32),
            easting: 389_012.7,
            northing: 5_819_123.9,
        };
        assert_eq!(format_utm(&point), "32N 389012E 5819123N");
        assert_eq!(format_grid_ref(&point, 'U'), "32U 38 89012 19123");
    }

    #[test]
    fn latitude_band_covers_extended_x() {
        assert_eq!(latitude_band(52.5), Some('U'));
        assert_eq!(latitude_band(-80.0), Some('C'));
        assert_eq!(latitude_band(83.0), Some('X'));
        assert_eq!(latitude_band(85.0), None);
    }

    #[test]
    fn readout_from_geodetic_source() {
        let readout = coordinate_readout(
            MapPoint::new(13.405, 52.52),
            &CrsId::wgs84(),
            UtmZone::north(32),
            &FixedUtm,
        );
        assert_eq!(readout.wgs84_decimal.text(), "52.520000, 13.405000");
        assert_eq!(readout.utm.text(), "32N 389012E 5819123N");
        assert_eq!(readout.grid_ref.text(), "32U 38 89012 19123");
    }

    #[test]
    fn failed_projection_marks_only_affected_entries() {
        let readout = coordinate_readout(
            MapPoint::new(1_000_000.0, 6_000_000.0),
            &CrsId::web_mercator(),
            UtmZone::north(32),
            &SphericalMercator,
        );
        assert!(readout.lat_lon_dms.is_available());
        assert!(readout.wgs84_decimal.is_available());
        assert_eq!(readout.utm.text(), UNAVAILABLE);
        assert_eq!(readout.grid_ref.text(), UNAVAILABLE);
    }
}
