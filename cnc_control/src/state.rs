//! Execution state machine.
//!
//! [`machine`] holds the transition table; [`session`] owns the program,
//! the machine collaborator and the offsets, and runs the state bodies.

pub mod machine;
pub mod session;

pub use machine::{Effect, ExecutionFsm, FsmState, Transition, TransitionResult};
