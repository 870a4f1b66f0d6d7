//! Machine driver implementations.
//!
//! - [`simulation`] - Software axis simulation for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `Machine` trait from `cnc_common::machine::driver`
//! 3. Register its factory in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::MachineRegistry;

/// Register all built-in drivers into `registry`.
pub fn register_all_drivers(registry: &mut MachineRegistry) {
    registry.register(simulation::DRIVER_NAME, simulation::create_machine);
}

/// Registry pre-populated with every built-in driver.
pub fn builtin_registry() -> MachineRegistry {
    let mut registry = MachineRegistry::new();
    register_all_drivers(&mut registry);
    registry
}
