//! Error types of the motion core.
//!
//! Parsing, geometry and profile failures are scoped to a single block and
//! wrapped into [`BlockError`]; [`ProgramError`] adds the source line.
//! [`RunError`] is what terminates the execution FSM.

use crate::cycle::CycleError;
use cnc_common::config::ConfigError;
use cnc_common::machine::driver::MachineError;
use std::path::PathBuf;
use thiserror::Error;

/// A G-code word could not be interpreted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid G-code field '{field}': {reason}")]
pub struct ParseError {
    /// Offending command letter, uppercased.
    pub field: char,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(field: char, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Arc geometry that cannot be resolved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Radius shorter than half the chord.
    #[error("arc radius {radius} is smaller than half chord {half_chord}")]
    DegenerateArc { radius: f64, half_chord: f64 },

    /// Radius-format arc whose start and end coincide.
    #[error("radius-format arc (R{radius}) with coincident endpoints")]
    CoincidentEndpoints { radius: f64 },

    /// Arc block with neither I/J nor R.
    #[error("arc without centre (I/J) or radius (R)")]
    MissingArcSpec,
}

/// Velocity profile synthesis failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// Acceleration limits or sampling period unusable.
    #[error("invalid kinematic limits: {0}")]
    InvalidKinematics(#[from] ConfigError),

    /// A feed move with positive length and no feed rate.
    #[error("feed move of length {length:.3} with zero feed rate")]
    ZeroFeed { length: f64 },
}

/// Any failure building a single block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Program loading failure.
#[derive(Debug, Error)]
pub enum ProgramError {
    /// Program file unreadable.
    #[error("cannot read program {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line failed to parse; `line` is 1-based.
    #[error("line {line} \"{text}\": {source}")]
    Block {
        line: usize,
        text: String,
        #[source]
        source: BlockError,
    },
}

/// Failure that terminates the execution FSM.
#[derive(Debug, Error)]
pub enum RunError {
    /// Setpoint delivery or feedback failed.
    #[error("machine failure: {0}")]
    Machine(#[from] MachineError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Tick sink or operator console failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cycle(#[from] CycleError),
}
