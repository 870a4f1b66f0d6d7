//! Simulation driver.
//!
//! Stands in for a physical machine: each axis tracks its setpoint under
//! velocity and acceleration limits.

mod axis;
mod machine;

pub use axis::AxisSimulator;
pub use machine::SimulatedMachine;

use cnc_common::machine::config::MachineConfig;
use cnc_common::machine::driver::{Machine, MachineError};

/// Registry name of the simulation driver.
pub const DRIVER_NAME: &str = "simulation";

/// Factory function to create a simulated machine.
pub fn create_machine(config: &MachineConfig) -> Result<Box<dyn Machine>, MachineError> {
    config
        .simulation
        .validate()
        .map_err(|e| MachineError::ConfigError(e.to_string()))?;
    Ok(Box::new(SimulatedMachine::new(&config.simulation)))
}
