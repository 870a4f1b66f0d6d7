//! Machine configuration types.
//!
//! - `MachineConfig` - main configuration loaded from `machine.toml`
//! - `Kinematics` - acceleration limits, feed limit, sampling period
//! - `RunConfig` - pacing and tick-log options
//! - `SimulationConfig` - per-axis limits of the simulation driver

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_ACCELERATION, DEFAULT_FEED_MAX, DEFAULT_MAX_ERROR, DEFAULT_RAPID_DURATION,
    DEFAULT_STARTUP_PAUSE_MS, DEFAULT_TQ,
};
use crate::point::Point;
use serde::{Deserialize, Serialize};

fn default_acceleration() -> f64 {
    DEFAULT_ACCELERATION
}

fn default_feed_max() -> f64 {
    DEFAULT_FEED_MAX
}

fn default_tq() -> f64 {
    DEFAULT_TQ
}

fn default_max_error() -> f64 {
    DEFAULT_MAX_ERROR
}

fn default_rapid_duration() -> f64 {
    DEFAULT_RAPID_DURATION
}

fn default_startup_pause_ms() -> u64 {
    DEFAULT_STARTUP_PAUSE_MS
}

fn default_sim_velocity() -> f64 {
    500.0
}

fn default_sim_acceleration() -> f64 {
    5000.0
}

/// Main configuration loaded from `machine.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Service identity and log level.
    pub shared: SharedConfig,

    #[serde(default)]
    pub kinematics: Kinematics,

    /// Machine starting position.
    #[serde(default = "Point::origin")]
    pub zero: Point,

    /// Initial session offset.
    #[serde(default = "Point::origin")]
    pub offset: Point,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl MachineConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.kinematics.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

/// Kinematic limits shared by every block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// Acceleration limit `A` [mm/s²].
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,

    /// Deceleration limit `D` [mm/s²], positive magnitude.
    #[serde(default = "default_acceleration")]
    pub deceleration: f64,

    /// Upper bound on programmed feed [mm/min].
    #[serde(default = "default_feed_max")]
    pub feed_max: f64,

    /// Sampling (quantization) period [s].
    #[serde(default = "default_tq")]
    pub tq: f64,

    /// Tracking error at which a Rapid block is considered reached [mm].
    #[serde(default = "default_max_error")]
    pub max_error: f64,

    /// Fixed traversal time of Rapid blocks [s].
    #[serde(default = "default_rapid_duration")]
    pub rapid_duration: f64,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            acceleration: DEFAULT_ACCELERATION,
            deceleration: DEFAULT_ACCELERATION,
            feed_max: DEFAULT_FEED_MAX,
            tq: DEFAULT_TQ,
            max_error: DEFAULT_MAX_ERROR,
            rapid_duration: DEFAULT_RAPID_DURATION,
        }
    }
}

impl Kinematics {
    /// Acceleration and deceleration must both be strictly positive.
    pub fn validate_rates(&self) -> Result<(), ConfigError> {
        if !(self.acceleration > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "kinematics.acceleration must be > 0, got {}",
                self.acceleration
            )));
        }
        if !(self.deceleration > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "kinematics.deceleration must be > 0, got {}",
                self.deceleration
            )));
        }
        Ok(())
    }

    /// Validate all kinematic limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_rates()?;
        let positive = [
            ("feed_max", self.feed_max),
            ("tq", self.tq),
            ("rapid_duration", self.rapid_duration),
        ];
        for (key, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "kinematics.{key} must be > 0, got {value}"
                )));
            }
        }
        if !(self.max_error >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "kinematics.max_error must be >= 0, got {}",
                self.max_error
            )));
        }
        Ok(())
    }
}

/// How the tick loop waits between samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    /// Sleep until each absolute tick deadline.
    #[default]
    Realtime,
    /// Run ticks back to back (simulation, tests).
    Unpaced,
}

/// Per-tick log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TickFormat {
    /// Whitespace-separated columns with a header per block.
    #[default]
    Table,
    /// One JSON object per tick.
    Json,
}

/// Run-time behaviour of the binary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub pacing: Pacing,

    /// Pause after enabling the viewer during Init [ms].
    #[serde(default = "default_startup_pause_ms")]
    pub startup_pause_ms: u64,

    #[serde(default)]
    pub tick_format: TickFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            startup_pause_ms: DEFAULT_STARTUP_PAUSE_MS,
            tick_format: TickFormat::default(),
        }
    }
}

/// Axis limits of the `simulation` driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Per-axis velocity limit [mm/s].
    #[serde(default = "default_sim_velocity")]
    pub max_velocity: f64,

    /// Per-axis acceleration limit [mm/s²].
    #[serde(default = "default_sim_acceleration")]
    pub max_acceleration: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_velocity: default_sim_velocity(),
            max_acceleration: default_sim_acceleration(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_velocity > 0.0) || !(self.max_acceleration > 0.0) {
            return Err(ConfigError::ValidationError(
                "simulation limits must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
