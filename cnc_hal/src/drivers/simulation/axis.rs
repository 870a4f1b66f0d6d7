//! Axis physics simulator.
//!
//! Positioning kinematics with velocity and acceleration limits: the axis
//! accelerates toward its target, cruises at the velocity limit, and brakes
//! once the remaining distance falls inside its stopping distance.

use cnc_common::machine::config::SimulationConfig;
use tracing::trace;

/// Single simulated linear axis.
#[derive(Debug, Clone)]
pub struct AxisSimulator {
    /// Axis name, used in trace output
    name: &'static str,
    /// Velocity limit [mm/s]
    max_velocity: f64,
    /// Acceleration limit [mm/s²]
    max_acceleration: f64,
    /// Current position [mm]
    position: f64,
    /// Current velocity [mm/s]
    velocity: f64,
    /// Target position from the last setpoint
    target_position: f64,
    /// Lag error (target - actual)
    lag_error: f64,
}

impl AxisSimulator {
    /// Create an axis at rest at 0.
    pub fn new(name: &'static str, limits: &SimulationConfig) -> Self {
        Self {
            name,
            max_velocity: limits.max_velocity,
            max_acceleration: limits.max_acceleration,
            position: 0.0,
            velocity: 0.0,
            target_position: 0.0,
            lag_error: 0.0,
        }
    }

    /// Set the position to track.
    pub fn set_target(&mut self, target: f64) {
        self.target_position = target;
        self.lag_error = self.target_position - self.position;
    }

    /// Advance the axis by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let position_error = self.target_position - self.position;
        let max_vel = self.max_velocity;
        let max_acc = self.max_acceleration;

        // Brake when inside the stopping distance, otherwise head for max velocity.
        let stopping_distance = self.velocity * self.velocity / (2.0 * max_acc);
        let desired_velocity = if position_error.abs() <= stopping_distance {
            position_error.signum() * (2.0 * max_acc * position_error.abs()).sqrt().min(max_vel)
        } else {
            position_error.signum() * max_vel
        };

        let max_vel_change = max_acc * dt;
        let vel_change = (desired_velocity - self.velocity).clamp(-max_vel_change, max_vel_change);
        let velocity = (self.velocity + vel_change).clamp(-max_vel, max_vel);
        let step = velocity * dt;

        // Land on the target when this step would cross it and the axis can stop within one tick.
        let crosses = step.abs() >= position_error.abs() && step.signum() == position_error.signum();
        if crosses && velocity.abs() <= max_vel_change {
            self.position = self.target_position;
            self.velocity = 0.0;
        } else {
            self.position += step;
            self.velocity = velocity;
        }

        self.lag_error = self.target_position - self.position;

        trace!(
            "Axis {}: pos={:.4}, vel={:.3}, target={:.4}, lag={:.4}",
            self.name, self.position, self.velocity, self.target_position, self.lag_error
        );
    }

    /// Teleport the axis to `pos`, at rest and with no lag.
    pub fn set_position(&mut self, pos: f64) {
        self.position = pos;
        self.target_position = pos;
        self.velocity = 0.0;
        self.lag_error = 0.0;
    }

    /// Stop the axis where it stands.
    pub fn reset_dynamics(&mut self) {
        self.velocity = 0.0;
        self.target_position = self.position;
        self.lag_error = 0.0;
    }

    /// Actual position [mm].
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Actual velocity [mm/s].
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Target minus actual position [mm].
    pub fn lag_error(&self) -> f64 {
        self.lag_error
    }

    /// Axis name.
    pub fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.005;

    fn limits() -> SimulationConfig {
        SimulationConfig {
            max_velocity: 100.0,
            max_acceleration: 1000.0,
        }
    }

    fn run_until_settled(axis: &mut AxisSimulator, max_steps: usize) -> usize {
        for step in 0..max_steps {
            axis.update(DT);
            if axis.lag_error() == 0.0 && axis.velocity() == 0.0 {
                return step + 1;
            }
        }
        max_steps
    }

    #[test]
    fn axis_reaches_target_and_stops() {
        let mut axis = AxisSimulator::new("X", &limits());
        axis.set_target(10.0);
        let steps = run_until_settled(&mut axis, 10_000);
        assert!(steps < 10_000, "axis never settled");
        assert_eq!(axis.position(), 10.0);
        assert_eq!(axis.velocity(), 0.0);
    }

    #[test]
    fn axis_moves_backwards() {
        let mut axis = AxisSimulator::new("Y", &limits());
        axis.set_position(5.0);
        axis.set_target(-5.0);
        run_until_settled(&mut axis, 10_000);
        assert_eq!(axis.position(), -5.0);
    }

    #[test]
    fn velocity_never_exceeds_limit() {
        let mut axis = AxisSimulator::new("X", &limits());
        axis.set_target(1000.0);
        for _ in 0..2000 {
            axis.update(DT);
            assert!(axis.velocity().abs() <= 100.0 + 1e-9);
        }
    }

    #[test]
    fn acceleration_is_limited_per_step() {
        let mut axis = AxisSimulator::new("X", &limits());
        axis.set_target(1000.0);
        let mut previous = axis.velocity();
        for _ in 0..50 {
            axis.update(DT);
            assert!((axis.velocity() - previous).abs() <= 1000.0 * DT + 1e-9);
            previous = axis.velocity();
        }
    }

    #[test]
    fn reset_keeps_position() {
        let mut axis = AxisSimulator::new("Z", &limits());
        axis.set_target(50.0);
        for _ in 0..20 {
            axis.update(DT);
        }
        let here = axis.position();
        axis.reset_dynamics();
        assert_eq!(axis.position(), here);
        assert_eq!(axis.velocity(), 0.0);
        assert_eq!(axis.lag_error(), 0.0);
    }
}
