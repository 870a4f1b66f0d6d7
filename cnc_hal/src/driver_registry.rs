//! Machine driver registry.
//!
//! Maps driver names to [`MachineFactory`] functions. The registry is built
//! at startup and handed to whoever opens the machine; there is no global
//! state.

use cnc_common::machine::config::MachineConfig;
use cnc_common::machine::driver::{Machine, MachineError, MachineFactory};
use std::collections::HashMap;
use tracing::debug;

/// Registry of available machine drivers.
pub struct MachineRegistry {
    factories: HashMap<&'static str, MachineFactory>,
}

impl MachineRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: MachineFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<MachineFactory> {
        self.factories.get(name).copied()
    }

    /// Create a machine instance by driver name.
    ///
    /// # Errors
    /// Returns `MachineError::DriverNotFound` if no driver with the given name
    /// is registered, or whatever the factory reports.
    pub fn create(
        &self,
        name: &str,
        config: &MachineConfig,
    ) -> Result<Box<dyn Machine>, MachineError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| MachineError::DriverNotFound(name.to_string()))?;
        let machine = factory(config)?;
        debug!("Created machine driver '{}'", machine.name());
        Ok(machine)
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for MachineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
