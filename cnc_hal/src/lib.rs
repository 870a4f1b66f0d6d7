//! # CNC HAL Library
//!
//! Machine back-ends for the motion core. Every back-end implements the
//! `Machine` trait from `cnc_common::machine::driver` and is created by name
//! through a [`MachineRegistry`].
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Machine factory registration
//! - [`drivers`] - Machine implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        cnc_hal                            │
//! │  ┌──────────────────┐        ┌──────────────────────────┐ │
//! │  │ MachineRegistry  │──────► │ Machine (trait object)   │ │
//! │  │  name → factory  │        │  simulation: 3 × Axis    │ │
//! │  └──────────────────┘        └──────────────────────────┘ │
//! └───────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::MachineRegistry;
pub use crate::drivers::register_all_drivers;
