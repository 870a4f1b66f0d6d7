//! Three-axis simulated machine.

use super::axis::AxisSimulator;
use cnc_common::machine::config::SimulationConfig;
use cnc_common::machine::driver::{Machine, MachineError};
use cnc_common::point::Point;
use tracing::debug;

/// Simulated Cartesian machine implementing [`Machine`].
///
/// Tracking error is the Euclidean distance between the last setpoint and
/// the actual position of the three axes.
#[derive(Debug, Clone)]
pub struct SimulatedMachine {
    axes: [AxisSimulator; 3],
    setpoint: Point,
}

impl SimulatedMachine {
    /// Create a machine at rest at the origin.
    pub fn new(limits: &SimulationConfig) -> Self {
        Self {
            axes: [
                AxisSimulator::new("X", limits),
                AxisSimulator::new("Y", limits),
                AxisSimulator::new("Z", limits),
            ],
            setpoint: Point::origin(),
        }
    }

    /// Last commanded setpoint.
    pub fn setpoint(&self) -> Point {
        self.setpoint
    }
}

impl Machine for SimulatedMachine {
    fn name(&self) -> &'static str {
        super::DRIVER_NAME
    }

    fn reset(&mut self) -> Result<(), MachineError> {
        for axis in &mut self.axes {
            axis.reset_dynamics();
        }
        self.setpoint = self.position();
        debug!("Simulated machine reset at {}", self.setpoint);
        Ok(())
    }

    fn set_position(&mut self, position: Point) -> Result<(), MachineError> {
        let [x, y, z] = &mut self.axes;
        x.set_position(position.x());
        y.set_position(position.y());
        z.set_position(position.z());
        self.setpoint = Point::new(position.x(), position.y(), position.z());
        Ok(())
    }

    fn go_to(&mut self, setpoint: Point) -> Result<(), MachineError> {
        if !(setpoint.x().is_finite() && setpoint.y().is_finite() && setpoint.z().is_finite()) {
            return Err(MachineError::CommunicationError(format!(
                "non-finite setpoint {setpoint}"
            )));
        }
        let [x, y, z] = &mut self.axes;
        x.set_target(setpoint.x());
        y.set_target(setpoint.y());
        z.set_target(setpoint.z());
        self.setpoint = setpoint;
        Ok(())
    }

    fn do_step(&mut self, dt: f64) -> Result<(), MachineError> {
        if !(dt > 0.0) {
            return Err(MachineError::ConfigError(format!("step must be > 0 s, got {dt}")));
        }
        for axis in &mut self.axes {
            axis.update(dt);
        }
        Ok(())
    }

    fn error(&self) -> f64 {
        self.setpoint.distance(&self.position())
    }

    fn position(&self) -> Point {
        let [x, y, z] = &self.axes;
        Point::new(x.position(), y.position(), z.position())
    }

    fn velocity(&self) -> Point {
        let [x, y, z] = &self.axes;
        Point::new(x.velocity(), y.velocity(), z.velocity())
    }
}
