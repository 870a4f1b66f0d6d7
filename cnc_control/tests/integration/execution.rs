//! Integration test: whole sessions from Init to Stop.

use cnc_common::machine::config::TickFormat;
use cnc_common::machine::driver::MachineError;
use cnc_common::point::Point;
use cnc_control::block::Block;
use cnc_control::cycle::TickWriter;
use cnc_control::operator::{Directive, ScriptedOperator};
use cnc_control::state::FsmState;
use cnc_control::{MachineSource, ProgramError, ProgramSource, RunError, Session};
use cnc_hal::drivers::builtin_registry;

use super::support::{FixedViewer, RecordingMachine, SharedBuffer, config, config_with, point_of};

const TQ: f64 = 0.005;

fn session_with(
    program: &str,
    machine: RecordingMachine,
    script: Vec<Directive>,
) -> (Session, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let session = Session::new(
        config(),
        ProgramSource::Text(program.to_string()),
        MachineSource::Instance(Box::new(machine)),
        ScriptedOperator::new(script),
    )
    .with_tick_output(TickWriter::new(buffer.clone(), TickFormat::Json));
    (session, buffer)
}

// ── Single feed move ────────────────────────────────────────────────

#[test]
fn line_runs_for_its_whole_profile() {
    let line = "N10 G01 X10 Y0 Z0 F600";
    let (machine, log) = RecordingMachine::new();
    let (mut session, ticks) = session_with(line, machine, vec![Directive::Run]);

    session.run().unwrap();
    assert_eq!(session.state(), FsmState::Stop);

    let block = Block::parse(line, None, &config().kinematics).unwrap();
    let expected_ticks = (block.profile.dt_total / TQ).round() as usize + 1;

    let records = ticks.records();
    assert_eq!(records.len(), expected_ticks);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].ticks as usize, expected_ticks);
    assert_eq!(session.history()[0].blocks_executed, 1);

    let first = &records[0];
    assert_eq!(first["n"], 10);
    assert_eq!(first["kind"], "line");
    assert_eq!(first["time"], 0.0);
    assert!(point_of(&first["commanded"]).approx_eq(&Point::origin(), 1e-12));

    let last = records.last().unwrap();
    assert!(point_of(&last["commanded"]).approx_eq(&Point::new(10.0, 0.0, 0.0), 1e-9));

    // Commanded X never moves backwards.
    let xs: Vec<f64> = records.iter().map(|r| r["commanded"]["x"].as_f64().unwrap()).collect();
    assert!(xs.windows(2).all(|w| w[1] >= w[0]));

    let log = log.lock();
    assert_eq!(log.setpoints.len(), expected_ticks);
    assert!(log.steps.iter().all(|&dt| dt == TQ));
    // Init → Idle and Run → Idle both reset the machine.
    assert_eq!(log.resets, 2);
    assert_eq!(log.positions_set, vec![Point::origin()]);
    assert_eq!(log.shutdowns, 1);
}

// ── Rapid ───────────────────────────────────────────────────────────

#[test]
fn rapid_ends_once_error_is_within_threshold() {
    let (machine, log) = RecordingMachine::new();
    let (mut session, ticks) =
        session_with("G00 X100 Y100 Z100", machine, vec![Directive::Run]);

    session.run().unwrap();

    let records = ticks.records();
    let target = Point::new(100.0, 100.0, 100.0);
    // The recording machine halves its error each step: 173.2 mm → ≤ 5 µm in 16 steps.
    assert_eq!(records.len(), 16);
    assert!(records.len() < (60.0 / TQ) as usize);
    for r in &records {
        assert_eq!(r["kind"], "rapid");
        assert!(point_of(&r["commanded"]).approx_eq(&target, 1e-12));
    }
    assert!(records.last().unwrap()["error"].as_f64().unwrap() <= 0.005);
    assert!(records[records.len() - 2]["error"].as_f64().unwrap() > 0.005);
    assert_eq!(log.lock().setpoints.len(), 16);
}

// ── Offsets ─────────────────────────────────────────────────────────

#[test]
fn set_offset_shifts_following_line() {
    let program = "G92 X5 Y-2\nG01 X10 F600\n";
    let (machine, log) = RecordingMachine::new();
    let (mut session, ticks) = session_with(program, machine, vec![Directive::Run]);

    session.run().unwrap();

    assert_eq!(session.offset(), Point::new(5.0, -2.0, 0.0));
    let summary = session.history()[0];
    assert_eq!(summary.offsets_applied, 1);
    assert_eq!(summary.blocks_executed, 1);

    let records = ticks.records();
    assert!(point_of(&records[0]["commanded"]).approx_eq(&Point::new(5.0, -2.0, 0.0), 1e-12));
    assert!(
        point_of(&records.last().unwrap()["commanded"])
            .approx_eq(&Point::new(15.0, -2.0, 0.0), 1e-9)
    );
    assert!(log.lock().setpoints.iter().all(|p| p.y() == -2.0));
}

#[test]
fn clear_offset_restores_program_coordinates() {
    let program = "G92 X5\nG92.1\nG01 X10 F600\n";
    let (machine, _log) = RecordingMachine::new();
    let (mut session, ticks) = session_with(program, machine, vec![Directive::Run]);

    session.run().unwrap();

    assert_eq!(session.offset(), Point::origin());
    assert_eq!(session.history()[0].offsets_applied, 2);
    let last = ticks.records().pop().unwrap();
    assert!(point_of(&last["commanded"]).approx_eq(&Point::new(10.0, 0.0, 0.0), 1e-9));
}

#[test]
fn configured_offset_is_the_initial_offset() {
    let buffer = SharedBuffer::default();
    let (machine, _log) = RecordingMachine::new();
    let mut session = Session::new(
        config_with("[offset]\nz = 1.5\n"),
        ProgramSource::Text("G1 X1 F600".into()),
        MachineSource::Instance(Box::new(machine)),
        ScriptedOperator::new([Directive::Run]),
    )
    .with_tick_output(TickWriter::new(buffer.clone(), TickFormat::Json));

    session.run().unwrap();
    assert!(buffer.records().iter().all(|r| r["commanded"]["z"] == 1.5));
}

// ── Skipped blocks ──────────────────────────────────────────────────

#[test]
fn arcs_are_skipped() {
    let program = "G1 X10 F600\nG2 X20 Y0 R5\nG1 X30\n";
    let (machine, _log) = RecordingMachine::new();
    let (mut session, ticks) = session_with(program, machine, vec![Directive::Run]);

    session.run().unwrap();

    let summary = session.history()[0];
    assert_eq!(summary.blocks_executed, 2);
    assert_eq!(summary.blocks_skipped, 1);
    assert!(ticks.records().iter().all(|r| r["kind"] == "line"));
}

// ── Operator directives ─────────────────────────────────────────────

#[test]
fn status_and_unknown_input_stay_idle() {
    let (machine, log) = RecordingMachine::new();
    let (mut session, ticks) = session_with(
        "G1 X1 F600",
        machine,
        vec![
            Directive::ShowStatus,
            Directive::Unrecognized("x".into()),
        ],
    );

    session.run().unwrap();

    assert!(session.history().is_empty());
    assert!(ticks.text().is_empty());
    assert_eq!(log.lock().status_reads, 1);
    assert_eq!(log.lock().resets, 1);
    assert_eq!(log.lock().shutdowns, 1);
}

#[test]
fn capture_offset_without_viewer_uses_machine_position() {
    let (machine, log) = RecordingMachine::new();
    let mut session = Session::new(
        config_with("[zero]\nx = 7.0\ny = 8.0\nz = 9.0\n"),
        ProgramSource::Text("G1 X1 F600".into()),
        MachineSource::Instance(Box::new(machine)),
        ScriptedOperator::new([Directive::CaptureOffset]),
    );

    session.run().unwrap();
    assert_eq!(session.offset(), Point::new(7.0, 8.0, 9.0));
    // Capturing shows the status with the new offset.
    assert_eq!(log.lock().status_reads, 1);
}

#[test]
fn viewer_drives_offset_capture_and_start_sync() {
    let (machine, log) = RecordingMachine::new();
    let (viewer, enabled) = FixedViewer::at(1.0, 2.0, 3.0);
    let buffer = SharedBuffer::default();
    let mut session = Session::new(
        config(),
        ProgramSource::Text("G1 X10 F600".into()),
        MachineSource::Instance(Box::new(machine)),
        ScriptedOperator::new([Directive::CaptureOffset, Directive::Run]),
    )
    .with_viewer(viewer)
    .with_tick_output(TickWriter::new(buffer.clone(), TickFormat::Json));

    session.run().unwrap();

    assert!(*enabled.lock());
    assert_eq!(session.offset(), Point::new(1.0, 2.0, 3.0));
    assert_eq!(
        log.lock().positions_set,
        vec![Point::origin(), Point::new(1.0, 2.0, 3.0)]
    );
    let first = &buffer.records()[0];
    assert!(point_of(&first["commanded"]).approx_eq(&Point::new(1.0, 2.0, 3.0), 1e-12));
}

#[test]
fn each_run_restarts_cumulative_time() {
    let (machine, log) = RecordingMachine::new();
    let (mut session, ticks) =
        session_with("G1 X1 F600", machine, vec![Directive::Run, Directive::Run]);

    session.run().unwrap();

    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[0].ticks, session.history()[1].ticks);
    let zero_times = ticks
        .records()
        .iter()
        .filter(|r| r["time"] == 0.0)
        .count();
    assert_eq!(zero_times, 2);
    assert_eq!(log.lock().resets, 3);
}

// ── Failures ────────────────────────────────────────────────────────

#[test]
fn transport_failure_aborts_and_releases() {
    let (machine, log) = RecordingMachine::failing_after(3);
    let (mut session, _ticks) = session_with("G1 X10 F600", machine, vec![Directive::Run]);

    let err = session.run().unwrap_err();
    assert!(matches!(
        err,
        RunError::Machine(MachineError::CommunicationError(_))
    ));
    assert_eq!(session.state(), FsmState::Run);
    assert!(session.program().is_none());
    let log = log.lock();
    assert_eq!(log.setpoints.len(), 3);
    assert_eq!(log.shutdowns, 1);
}

#[test]
fn parse_error_stops_init() {
    let (machine, log) = RecordingMachine::new();
    let (mut session, _ticks) = session_with("G1 X1 F600\nG1 Q2\n", machine, vec![]);

    let err = session.run().unwrap_err();
    match err {
        RunError::Program(ProgramError::Block { line, .. }) => assert_eq!(line, 2),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(session.state(), FsmState::Init);
    assert!(log.lock().setpoints.is_empty());
}

#[test]
fn missing_program_file_is_reported() {
    let (machine, _log) = RecordingMachine::new();
    let mut session = Session::new(
        config(),
        ProgramSource::File("/nonexistent/part.ngc".into()),
        MachineSource::Instance(Box::new(machine)),
        ScriptedOperator::default(),
    );
    assert!(matches!(
        session.run(),
        Err(RunError::Program(ProgramError::Io { .. }))
    ));
}

// ── Built-in driver ─────────────────────────────────────────────────

#[test]
fn simulation_driver_executes_program() {
    let buffer = SharedBuffer::default();
    let mut session = Session::new(
        config(),
        ProgramSource::Text("G0 X10 Y10\nG1 X20 F600\n".into()),
        MachineSource::Registry {
            registry: builtin_registry(),
            driver: "simulation".into(),
        },
        ScriptedOperator::new([Directive::Run]),
    )
    .with_tick_output(TickWriter::new(buffer.clone(), TickFormat::Json));

    session.run().unwrap();

    let summary = session.history()[0];
    assert_eq!(summary.blocks_executed, 2);
    let last = buffer.records().pop().unwrap();
    assert!(point_of(&last["actual"]).approx_eq(&Point::new(20.0, 10.0, 0.0), 0.05));
}

#[test]
fn unknown_driver_is_fatal() {
    let mut session = Session::new(
        config(),
        ProgramSource::Text("G1 X1 F600".into()),
        MachineSource::Registry {
            registry: builtin_registry(),
            driver: "ethercat".into(),
        },
        ScriptedOperator::default(),
    );
    assert!(matches!(
        session.run(),
        Err(RunError::Machine(MachineError::DriverNotFound(_)))
    ));
}
