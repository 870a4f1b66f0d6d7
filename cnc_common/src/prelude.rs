//! Prelude module for common re-exports.
//!
//! ```rust
//! use cnc_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::machine::config::{
    Kinematics, MachineConfig, Pacing, RunConfig, SimulationConfig, TickFormat,
};

// ─── Geometry ───────────────────────────────────────────────────────
pub use crate::point::{AxisMask, Point};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::machine::driver::{Machine, MachineError, MachineFactory, PositionSource};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::DEFAULT_CONFIG_PATH;
