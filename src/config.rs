// config.rs - Effect tuning
//
// Every field has a default, so partial JSON documents are accepted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Palette;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("speed range is inverted ({min} > {max})")]
    InvertedSpeed { min: f32, max: f32 },
    #[error("palette needs at least one stop in ascending order")]
    Palette,
}

/// How velocity damping relates to the frame delta
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DampingMode {
    /// Applied once per frame regardless of dt. Matches the site at 60 fps only.
    #[default]
    PerFrame,
    /// Raised to `dt * 60`, so the decay rate is the same at any refresh rate.
    Normalized,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Physics {
    pub damping: f32,
    pub damping_mode: DampingMode,
    /// px/s^2, positive is down
    pub gravity: f32,
    /// Seconds after spawn before gravity applies
    pub gravity_delay: f32,
    /// Extra damping on upward velocity once gravity is active
    pub rise_damping: f32,
    /// Upward speeds slower than this snap to zero
    pub rise_cutoff: f32,
    /// Slice assumed when there is no previous frame
    pub first_dt: f32,
    /// Largest slice a single step may take
    pub max_dt: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            damping: 0.98,
            damping_mode: DampingMode::PerFrame,
            gravity: 80.0,
            gravity_delay: 0.3,
            rise_damping: 0.9,
            rise_cutoff: 2.0,
            first_dt: 1.0 / 60.0,
            max_dt: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Emission {
    /// Particle lifetime in seconds
    pub duration: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub per_origin: u32,
    /// Positions remembered per particle for trail drawing
    pub trail_len: usize,
}

impl Default for Emission {
    fn default() -> Self {
        Self {
            duration: 1.5,
            speed_min: 60.0,
            speed_max: 160.0,
            per_origin: 3,
            trail_len: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleConfig {
    /// Milliseconds
    pub duration: f64,
    pub max_radius: f32,
    pub border_start: f32,
    pub border_end: f32,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            duration: 2000.0,
            max_radius: 800.0,
            border_start: 4.0,
            border_end: 2.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    pub physics: Physics,
    pub emission: Emission,
    pub ripple: RippleConfig,
    pub palette: Palette,
    /// Live particle cap. Unbounded when absent.
    pub max_particles: Option<usize>,
}

impl FxConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: FxConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("emission.duration", self.emission.duration)?;
        positive("ripple.duration", self.ripple.duration as f32)?;
        positive("physics.max_dt", self.physics.max_dt)?;
        positive("physics.first_dt", self.physics.first_dt)?;

        let Emission { speed_min, speed_max, .. } = self.emission;
        if speed_min > speed_max {
            return Err(ConfigError::InvertedSpeed { min: speed_min, max: speed_max });
        }
        if !self.palette.is_ordered() {
            return Err(ConfigError::Palette);
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 { Ok(()) } else { Err(ConfigError::NotPositive { field, value }) }
}
