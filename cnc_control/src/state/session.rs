//! Execution session: state bodies and transition effects.
//!
//! The [`Session`] owns every collaborator of the FSM as a named field.
//! Each state body borrows it mutably and returns the requested next state
//! (`None` for "no change"); [`ExecutionFsm`] decides whether the request
//! is honoured and which effect fires.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use cnc_common::machine::config::MachineConfig;
use cnc_common::machine::driver::{Machine, MachineError, PositionSource};
use cnc_common::point::Point;
use cnc_hal::MachineRegistry;
use tracing::{debug, error, info, warn};

use super::machine::{Effect, ExecutionFsm, FsmState, TransitionResult};
use crate::cycle::{self, Pacer, RunSummary, TickWriter};
use crate::error::RunError;
use crate::operator::{Directive, DirectiveSource};
use crate::program::Program;

/// Where the program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    File(PathBuf),
    Text(String),
}

/// How the machine collaborator is obtained during Init.
pub enum MachineSource {
    /// Created by driver name.
    Registry {
        registry: MachineRegistry,
        driver: String,
    },
    /// Ready-made instance.
    Instance(Box<dyn Machine>),
}

/// Everything the execution FSM works on.
pub struct Session {
    config: MachineConfig,
    program_source: ProgramSource,
    machine_source: Option<MachineSource>,
    program: Option<Program>,
    machine: Option<Box<dyn Machine>>,
    viewer: Option<Box<dyn PositionSource>>,
    operator: Box<dyn DirectiveSource>,
    offset: Point,
    ticks: TickWriter,
    pacer: Pacer,
    fsm: ExecutionFsm,
    history: Vec<RunSummary>,
}

impl Session {
    /// Session in `Init`; nothing is loaded until [`Session::run`].
    pub fn new(
        config: MachineConfig,
        program_source: ProgramSource,
        machine_source: MachineSource,
        operator: impl DirectiveSource + 'static,
    ) -> Self {
        let pacer = Pacer::new(config.run.pacing, config.kinematics.tq);
        let offset = config.offset;
        Self {
            config,
            program_source,
            machine_source: Some(machine_source),
            program: None,
            machine: None,
            viewer: None,
            operator: Box::new(operator),
            offset,
            ticks: TickWriter::discard(),
            pacer,
            fsm: ExecutionFsm::new(),
            history: Vec::new(),
        }
    }

    /// Attach a viewer used for position sync and offset capture.
    pub fn with_viewer(mut self, viewer: impl PositionSource + 'static) -> Self {
        self.viewer = Some(Box::new(viewer));
        self
    }

    /// Send tick records to `ticks` instead of discarding them.
    pub fn with_tick_output(mut self, ticks: TickWriter) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn state(&self) -> FsmState {
        self.fsm.state()
    }

    /// Current work offset added to every setpoint.
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// One summary per completed Run.
    pub fn history(&self) -> &[RunSummary] {
        &self.history
    }

    /// Loaded program (between Init and Stop).
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// Drive the FSM from its current state until Stop.
    ///
    /// # Errors
    ///
    /// The first error of any state body or effect. Collaborators are
    /// released before it is returned.
    pub fn run(&mut self) -> Result<(), RunError> {
        info!("[FSM] Session '{}' starting", self.config.shared.service_name);
        loop {
            let state = self.fsm.state();
            info!("[FSM] In state {}", state.name());

            let outcome = match state {
                FsmState::Init => self.on_init(),
                FsmState::Idle => self.on_idle(),
                FsmState::Run => self.on_run(),
                FsmState::Stop => {
                    self.release();
                    info!("[FSM] Session stopped after {} runs", self.history.len());
                    return Ok(());
                }
            };

            let result = outcome.and_then(|next| match self.fsm.request(next) {
                TransitionResult::Ok(t) => match t.effect {
                    Some(effect) => self.apply(effect),
                    None => Ok(()),
                },
                TransitionResult::Unchanged | TransitionResult::Rejected(_) => Ok(()),
            });

            if let Err(e) = result {
                error!("[FSM] Aborting in state {}: {e}", state.name());
                self.release();
                return Err(e);
            }
        }
    }

    // ─── State Bodies ───────────────────────────────────────────────

    fn on_init(&mut self) -> Result<Option<FsmState>, RunError> {
        self.config.validate()?;
        let limits = &self.config.kinematics;

        let program = match &self.program_source {
            ProgramSource::File(path) => Program::load(path, limits)?,
            ProgramSource::Text(text) => Program::parse_str(text, limits)?,
        };
        self.program = Some(program);

        let mut machine = match self.machine_source.take() {
            Some(MachineSource::Registry { registry, driver }) => {
                registry.create(&driver, &self.config)?
            }
            Some(MachineSource::Instance(machine)) => machine,
            None => {
                return Err(MachineError::InitFailed("machine already consumed".into()).into());
            }
        };
        info!("Machine driver '{}' attached", machine.name());

        if let Some(viewer) = self.viewer.as_mut() {
            viewer.enable()?;
            let pause = self.config.run.startup_pause_ms;
            debug!("Viewer enabled, pausing {pause} ms");
            thread::sleep(Duration::from_millis(pause));
        }

        machine.set_position(self.config.zero)?;
        self.machine = Some(machine);
        Ok(Some(FsmState::Idle))
    }

    fn on_idle(&mut self) -> Result<Option<FsmState>, RunError> {
        match self.operator.next_directive()? {
            Directive::Run => {
                if let Some(viewer) = self.viewer.as_mut() {
                    let start = viewer.coordinates()?;
                    self.machine_mut()?.set_position(start)?;
                    debug!("Machine start position synced to {start}");
                }
                Ok(Some(FsmState::Run))
            }
            Directive::CaptureOffset => {
                self.offset = match self.viewer.as_mut() {
                    Some(viewer) => viewer.coordinates()?,
                    None => self
                        .machine
                        .as_deref()
                        .map(|m| m.position())
                        .ok_or_else(not_initialized)?,
                };
                info!("Offset captured: {}", self.offset);
                self.show_status()?;
                Ok(None)
            }
            Directive::ShowStatus => {
                self.show_status()?;
                Ok(None)
            }
            Directive::Quit => Ok(Some(FsmState::Stop)),
            Directive::Unrecognized(input) => {
                warn!("Unrecognized directive '{input}'");
                Ok(None)
            }
        }
    }

    fn on_run(&mut self) -> Result<Option<FsmState>, RunError> {
        let (Some(program), Some(machine)) = (self.program.as_ref(), self.machine.as_deref_mut())
        else {
            return Err(MachineError::InitFailed("run requested before init".into()).into());
        };
        let summary = cycle::run_program(
            program,
            machine,
            &mut self.offset,
            &self.config.kinematics,
            &mut self.pacer,
            &mut self.ticks,
        )?;
        self.history.push(summary);
        Ok(Some(FsmState::Idle))
    }

    // ─── Effects ────────────────────────────────────────────────────

    fn apply(&mut self, effect: Effect) -> Result<(), RunError> {
        match effect {
            Effect::Setup => {
                self.machine_mut()?.reset()?;
                debug!("Machine dynamics reset");
            }
            Effect::Teardown => debug!("Teardown"),
        }
        Ok(())
    }

    fn show_status(&mut self) -> Result<(), RunError> {
        let machine = self.machine_mut()?;
        let (position, velocity) = (machine.position(), machine.velocity());
        info!("Machine position: {position}");
        info!("Machine velocity: {velocity}");
        if let Some(viewer) = self.viewer.as_mut() {
            info!("Viewer position:  {}", viewer.coordinates()?);
        }
        info!("Offset:           {}", self.offset);
        Ok(())
    }

    fn machine_mut(&mut self) -> Result<&mut (dyn Machine + 'static), MachineError> {
        self.machine.as_deref_mut().ok_or_else(not_initialized)
    }

    /// Drop program, machine and viewer; shutdown failures are only logged.
    fn release(&mut self) {
        if let Some(mut machine) = self.machine.take()
            && let Err(e) = machine.shutdown()
        {
            warn!("Machine shutdown failed: {e}");
        }
        self.program = None;
        self.viewer = None;
        if let Err(e) = self.ticks.flush() {
            warn!("Tick output flush failed: {e}");
        }
    }
}

fn not_initialized() -> MachineError {
    MachineError::InitFailed("machine not initialized".into())
}
