//! CNC Common Library
//!
//! Shared types, configuration loading and collaborator contracts for all
//! crates of the CNC workspace.
//!
//! # Module Structure
//!
//! - [`point`] - Three-axis coordinates with per-axis "explicitly set" tracking
//! - [`config`] - Configuration loading traits and types
//! - [`machine`] - Machine configuration and the `Machine` / `PositionSource` contracts
//! - [`consts`] - System-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use cnc_common::prelude::*;
//!
//! let mut p = Point::unset();
//! p.set_x(10.0);
//! p.inherit(&Point::origin());
//! assert!(p.is_resolved());
//! ```

pub mod config;
pub mod consts;
pub mod machine;
pub mod point;
pub mod prelude;
