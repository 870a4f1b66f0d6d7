//! System-wide constants for the CNC workspace.
//!
//! Single source of truth for numeric defaults and resolutions.

use std::f64::consts::TAU;

/// Resolution applied to path progress (λ) to suppress overshoot past 1.0.
pub const LAMBDA_RESOLUTION: f64 = 1.0e6;

/// Relative tolerance used when snapping durations to the sampling grid.
pub const QUANTIZE_EPSILON: f64 = 1.0e-9;

/// Tolerance on the end radius of centre-format (I/J) arcs [mm].
pub const ARC_RADIUS_TOLERANCE: f64 = 1.0e-3;

/// Full turn [rad].
pub const FULL_TURN: f64 = TAU;

/// Default acceleration / deceleration limit [mm/s²].
pub const DEFAULT_ACCELERATION: f64 = 125.0;

/// Default maximum feed rate [mm/min].
pub const DEFAULT_FEED_MAX: f64 = 10_000.0;

/// Default sampling (quantization) period [s].
pub const DEFAULT_TQ: f64 = 0.005;

/// Default rapid early-exit tracking error threshold [mm].
pub const DEFAULT_MAX_ERROR: f64 = 0.005;

/// Fixed traversal time of a Rapid block [s].
pub const DEFAULT_RAPID_DURATION: f64 = 60.0;

/// Default pause after enabling the viewer during Init [ms].
pub const DEFAULT_STARTUP_PAUSE_MS: u64 = 1000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/machine.toml";
