//! Adaptive initial marker size.

use crate::config::SizingConfig;

/// Size for a newly placed marker.
///
/// Scales the base size by the view resolution, clamps it into the creation
/// range and never goes below the smallest marker already in the scene.
pub fn adaptive_size(
    map_units_per_pixel: f64,
    smallest_existing: Option<f64>,
    config: &SizingConfig,
) -> f64 {
    let scaled = config.base_size * (1.0 / map_units_per_pixel.max(config.min_resolution));
    let clamped = scaled.clamp(config.creation_min, config.creation_max);
    match smallest_existing {
        Some(smallest) if smallest > clamped => smallest,
        _ => clamped,
    }
}
