//! Machine-side contracts and configuration.
//!
//! - [`config`] - `MachineConfig` loaded from `machine.toml`
//! - [`driver`] - `Machine` and `PositionSource` collaborator traits

pub mod config;
pub mod driver;
