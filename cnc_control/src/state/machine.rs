//! Execution FSM transitions.
//!
//! Init → Idle ⇄ Run, Idle → Stop. Edges that change state carry an
//! [`Effect`]; every other request is rejected and the state is kept.

use serde::Serialize;
use tracing::{info, warn};

/// Execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum FsmState {
    /// Load program and machine, place the machine at the zero point.
    #[default]
    Init = 0,
    /// Wait for an operator directive.
    Idle = 1,
    /// Execute the program once.
    Run = 2,
    /// Release everything (terminal).
    Stop = 3,
}

impl FsmState {
    /// Convert from u8.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Init),
            1 => Some(Self::Idle),
            2 => Some(Self::Run),
            3 => Some(Self::Stop),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Stop => "stop",
        }
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Side effect fired on a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Reset the machine's dynamics.
    Setup,
    /// End-of-session hook.
    Teardown,
}

/// Accepted state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: FsmState,
    pub to: FsmState,
    pub effect: Option<Effect>,
}

/// Result of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// No state change was requested.
    Unchanged,
    /// Transition accepted; the state has changed.
    Ok(Transition),
    /// Transition rejected; the state is unchanged.
    Rejected(&'static str),
}

/// Holder of the current execution state.
#[derive(Debug, Clone, Default)]
pub struct ExecutionFsm {
    state: FsmState,
}

impl ExecutionFsm {
    pub const fn new() -> Self {
        Self {
            state: FsmState::Init,
        }
    }

    #[inline]
    pub const fn state(&self) -> FsmState {
        self.state
    }

    /// Apply the outcome of a state body: `None` keeps the current state.
    pub fn request(&mut self, next: Option<FsmState>) -> TransitionResult {
        use FsmState::*;

        let Some(to) = next else {
            return TransitionResult::Unchanged;
        };
        let from = self.state;

        let effect = match (from, to) {
            (Init, Idle) => Some(Effect::Setup),
            (Idle, Run) => None,
            (Idle, Stop) => Some(Effect::Teardown),
            (Run, Idle) => Some(Effect::Setup),
            _ => {
                let reason = invalid_transition_reason(from);
                warn!(
                    "[FSM] Rejected transition {} -> {}: {reason}",
                    from.name(),
                    to.name()
                );
                return TransitionResult::Rejected(reason);
            }
        };

        info!("[FSM] State transition {} -> {}", from.name(), to.name());
        self.state = to;
        TransitionResult::Ok(Transition { from, to, effect })
    }
}

fn invalid_transition_reason(state: FsmState) -> &'static str {
    match state {
        FsmState::Init => "Init: only Idle allowed",
        FsmState::Idle => "Idle: only Run or Stop allowed",
        FsmState::Run => "Run: only Idle allowed",
        FsmState::Stop => "Stop is terminal",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
