//! Machine collaborator trait and error types.
//!
//! This module defines:
//! - `Machine` trait - setpoint sink and axis dynamics driven by the tick loop
//! - `PositionSource` trait - optional viewer / position-capture collaborator
//! - `MachineError` enum - error types for machine operations
//! - `MachineFactory` type alias - factory function type used by registries

use crate::machine::config::MachineConfig;
use crate::point::Point;
use thiserror::Error;

/// Error types for machine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration rejected by the driver
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Setpoint delivery or feedback read failed
    #[error("Machine communication error: {0}")]
    CommunicationError(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Viewer / position source failure
    #[error("Position source error: {0}")]
    PositionSourceError(String),
}

/// Factory function type for creating machine instances.
pub type MachineFactory = fn(&MachineConfig) -> Result<Box<dyn Machine>, MachineError>;

/// Interface between the motion core and a physical or simulated machine.
///
/// The tick loop issues exactly one `go_to` / `do_step` / `error` sequence per
/// sampling period, from a single thread.
///
/// # Lifecycle
///
/// 1. `set_position()` - starting position, before the first run
/// 2. `go_to()` + `do_step()` + `error()` - once per tick
/// 3. `reset()` - after each run (the FSM "setup" effect)
/// 4. `shutdown()` - when the session stops
pub trait Machine: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Reset internal dynamics (velocities, tracking error), keeping position.
    fn reset(&mut self) -> Result<(), MachineError>;

    /// Place the machine at `position` without motion.
    fn set_position(&mut self, position: Point) -> Result<(), MachineError>;

    /// Set the next target setpoint.
    fn go_to(&mut self, setpoint: Point) -> Result<(), MachineError>;

    /// Forward-integrate axis dynamics by `dt` seconds.
    fn do_step(&mut self, dt: f64) -> Result<(), MachineError>;

    /// Current tracking error magnitude [mm].
    fn error(&self) -> f64;

    /// Actual axis positions.
    fn position(&self) -> Point;

    /// Actual axis velocities [mm/s].
    fn velocity(&self) -> Point;

    /// Release transport resources. Default: nothing to release.
    fn shutdown(&mut self) -> Result<(), MachineError> {
        Ok(())
    }
}

/// Viewer or probe reporting where the operator wants the machine to be.
pub trait PositionSource: Send {
    /// Start reporting coordinates.
    fn enable(&mut self) -> Result<(), MachineError>;

    /// Latest reported coordinates.
    fn coordinates(&mut self) -> Result<Point, MachineError>;
}
