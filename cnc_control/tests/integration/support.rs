//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::Arc;

use cnc_common::config::ConfigLoader;
use cnc_common::machine::config::MachineConfig;
use cnc_common::machine::driver::{Machine, MachineError, PositionSource};
use cnc_common::point::Point;
use parking_lot::Mutex;

// ─── Configuration ──────────────────────────────────────────────────

pub const CONFIG_TOML: &str = r#"
[shared]
service_name = "cnc-test"

[kinematics]
acceleration = 100.0
deceleration = 50.0
feed_max = 1000.0
tq = 0.005
max_error = 0.005
rapid_duration = 60.0

[run]
pacing = "unpaced"
startup_pause_ms = 0
tick_format = "json"
"#;

pub fn config() -> MachineConfig {
    MachineConfig::from_toml(CONFIG_TOML).unwrap()
}

pub fn config_with(extra: &str) -> MachineConfig {
    MachineConfig::from_toml(&format!("{CONFIG_TOML}\n{extra}")).unwrap()
}

// ─── Recording Machine ──────────────────────────────────────────────

/// Everything the machine was asked to do.
#[derive(Debug, Default)]
pub struct MachineLog {
    pub setpoints: Vec<Point>,
    pub steps: Vec<f64>,
    pub positions_set: Vec<Point>,
    pub resets: usize,
    pub shutdowns: usize,
    /// Velocity readouts; only the status display asks for them.
    pub status_reads: usize,
}

/// Machine that closes half the distance to its setpoint on every step.
pub struct RecordingMachine {
    log: Arc<Mutex<MachineLog>>,
    position: Point,
    setpoint: Point,
    fail_after: Option<usize>,
}

impl RecordingMachine {
    pub fn new() -> (Self, Arc<Mutex<MachineLog>>) {
        let log = Arc::new(Mutex::new(MachineLog::default()));
        let machine = Self {
            log: Arc::clone(&log),
            position: Point::origin(),
            setpoint: Point::origin(),
            fail_after: None,
        };
        (machine, log)
    }

    /// Fail every `go_to` after the first `n`.
    pub fn failing_after(n: usize) -> (Self, Arc<Mutex<MachineLog>>) {
        let (mut machine, log) = Self::new();
        machine.fail_after = Some(n);
        (machine, log)
    }
}

impl Machine for RecordingMachine {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn reset(&mut self) -> Result<(), MachineError> {
        self.log.lock().resets += 1;
        self.setpoint = self.position;
        Ok(())
    }

    fn set_position(&mut self, position: Point) -> Result<(), MachineError> {
        self.log.lock().positions_set.push(position);
        self.position = position;
        self.setpoint = position;
        Ok(())
    }

    fn go_to(&mut self, setpoint: Point) -> Result<(), MachineError> {
        let mut log = self.log.lock();
        if self.fail_after.is_some_and(|n| log.setpoints.len() >= n) {
            return Err(MachineError::CommunicationError("link down".into()));
        }
        log.setpoints.push(setpoint);
        self.setpoint = setpoint;
        Ok(())
    }

    fn do_step(&mut self, dt: f64) -> Result<(), MachineError> {
        self.log.lock().steps.push(dt);
        self.position = self.position + (self.setpoint - self.position) * 0.5;
        Ok(())
    }

    fn error(&self) -> f64 {
        self.position.distance(&self.setpoint)
    }

    fn position(&self) -> Point {
        self.position
    }

    fn velocity(&self) -> Point {
        self.log.lock().status_reads += 1;
        Point::origin()
    }

    fn shutdown(&mut self) -> Result<(), MachineError> {
        self.log.lock().shutdowns += 1;
        Ok(())
    }
}

// ─── Viewer ─────────────────────────────────────────────────────────

/// Viewer that always reports the same coordinates.
pub struct FixedViewer {
    pub at: Point,
    pub enabled: Arc<Mutex<bool>>,
}

impl FixedViewer {
    pub fn at(x: f64, y: f64, z: f64) -> (Self, Arc<Mutex<bool>>) {
        let enabled = Arc::new(Mutex::new(false));
        let viewer = Self {
            at: Point::new(x, y, z),
            enabled: Arc::clone(&enabled),
        };
        (viewer, enabled)
    }
}

impl PositionSource for FixedViewer {
    fn enable(&mut self) -> Result<(), MachineError> {
        *self.enabled.lock() = true;
        Ok(())
    }

    fn coordinates(&mut self) -> Result<Point, MachineError> {
        Ok(self.at)
    }
}

// ─── Tick Sink ──────────────────────────────────────────────────────

/// `Write` handle whose bytes stay readable after the writer is moved.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }

    /// Parsed JSON tick records.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.text()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn point_of(value: &serde_json::Value) -> Point {
    Point::new(
        value["x"].as_f64().unwrap(),
        value["y"].as_f64().unwrap(),
        value["z"].as_f64().unwrap(),
    )
}
