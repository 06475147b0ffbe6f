//! Engine tuning parameters.
//!
//! # Responsibility
//! - Hold the throttle intervals, distance thresholds and clamp ranges used by
//!   the interaction controller and placement service.
//! - Load overrides from JSON and reject inconsistent values.
//!
//! # Invariants
//! - `Default` values are the tuned production constants.
//! - A config that passed `validate()` never produces a non-positive size.
//! - Every float that passed `validate()` is finite.

use crate::geometry::proximity::Tolerance;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub interaction: InteractionConfig,
    pub sizing: SizingConfig,
    pub tolerance: Tolerance,
}

impl EngineConfig {
    /// Parses a JSON document; missing keys fall back to defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interaction.validate()?;
        self.sizing.validate()?;
        match self.tolerance {
            Tolerance::Fixed(value) if !positive(value) => {
                Err(ConfigError::Invalid("tolerance must be > 0"))
            }
            Tolerance::SizeScaled { factor, floor }
                if !non_negative(factor) || !positive(floor) =>
            {
                Err(ConfigError::Invalid(
                    "tolerance factor must be >= 0 and floor > 0",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Pointer interaction throttles and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Minimum interval between hover probes.
    pub hover_probe_interval_ms: u64,
    /// Minimum interval between position writes while moving.
    pub move_write_interval_ms: u64,
    /// Map-unit distance a move must exceed before it is written.
    pub move_write_distance: f64,
    /// Minimum interval between detail-panel refreshes during a move.
    pub detail_refresh_interval_ms: u64,
    /// Minimum interval between full view refreshes during a move.
    pub view_refresh_interval_ms: u64,
    /// Handle hit radius in pixels.
    pub handle_radius_px: f64,
    pub resize_min: f64,
    pub resize_max: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            hover_probe_interval_ms: 100,
            move_write_interval_ms: 100,
            move_write_distance: 0.1,
            detail_refresh_interval_ms: 300,
            view_refresh_interval_ms: 150,
            handle_radius_px: 8.0,
            resize_min: 5.0,
            resize_max: 500.0,
        }
    }
}

impl InteractionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !non_negative(self.move_write_distance) {
            return Err(ConfigError::Invalid("move_write_distance must be >= 0"));
        }
        if !positive(self.handle_radius_px) {
            return Err(ConfigError::Invalid("handle_radius_px must be > 0"));
        }
        if !positive(self.resize_min)
            || !self.resize_max.is_finite()
            || self.resize_min > self.resize_max
        {
            return Err(ConfigError::Invalid(
                "resize range must satisfy 0 < resize_min <= resize_max",
            ));
        }
        Ok(())
    }
}

/// Creation-time sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub base_size: f64,
    /// Lower bound for map units per pixel in the adaptive formula.
    pub min_resolution: f64,
    pub creation_min: f64,
    pub creation_max: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_size: 30.0,
            min_resolution: 0.001,
            creation_min: 10.0,
            creation_max: 200.0,
        }
    }
}

impl SizingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.base_size) || !positive(self.min_resolution) {
            return Err(ConfigError::Invalid(
                "base_size and min_resolution must be > 0",
            ));
        }
        if !positive(self.creation_min)
            || !self.creation_max.is_finite()
            || self.creation_min > self.creation_max
        {
            return Err(ConfigError::Invalid(
                "creation range must satisfy 0 < creation_min <= creation_max",
            ));
        }
        Ok(())
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid engine config: {message}"),
            Self::Invalid(message) => write!(f, "invalid engine config: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use crate::geometry::proximity::Tolerance;

    #[test]
    fn defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interaction.move_write_interval_ms, 100);
        assert_eq!(config.sizing.creation_max, 200.0);
    }

    #[test]
    fn partial_json_overrides_only_given_keys() {
        let config = EngineConfig::from_json_str(
            r#"{ "interaction": { "move_write_distance": 0.5 }, "tolerance": { "Fixed": 12.0 } }"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.interaction.move_write_distance, 0.5);
        assert_eq!(config.interaction.view_refresh_interval_ms, 150);
        assert_eq!(config.tolerance, Tolerance::Fixed(12.0));
    }

    #[test]
    fn inverted_resize_range_is_rejected() {
        let err = EngineConfig::from_json_str(
            r#"{ "interaction": { "resize_min": 50.0, "resize_max": 10.0 } }"#,
        )
        .expect_err("inverted range must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut config = EngineConfig::default();
        config.tolerance = Tolerance::Fixed(f64::NAN);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.tolerance = Tolerance::SizeScaled {
            factor: f64::NAN,
            floor: 4.0,
        };
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sizing.base_size = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sizing.creation_max = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.interaction.move_write_distance = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.interaction.handle_radius_px = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ nope").expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
