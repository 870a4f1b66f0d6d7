//! # CNC Control Library
//!
//! Trajectory planning and execution core: turns G-code lines into
//! time-parameterized axis setpoints delivered to a [`Machine`] at a fixed
//! sampling period.
//!
//! ## Layers
//!
//! 1. **Block** - one parsed G-code line with resolved geometry
//! 2. **Profile** - trapezoidal/triangular velocity ramp owned by a block
//! 3. **Program** - ordered block arena with sequential traversal
//! 4. **Execution FSM** - Init → Idle ⇄ Run, Idle → Stop
//! 5. **Cycle** - paced tick loop feeding the machine
//!
//! [`Machine`]: cnc_common::machine::driver::Machine

pub mod block;
pub mod cycle;
pub mod error;
pub mod operator;
pub mod profile;
pub mod program;
pub mod state;

pub use crate::block::{ArcSpec, Block, BlockKind};
pub use crate::error::{BlockError, GeometryError, ParseError, ProfileError, ProgramError, RunError};
pub use crate::profile::{Profile, ProfileInput};
pub use crate::program::{BlockId, Program};
pub use crate::state::session::{MachineSource, ProgramSource, Session};
