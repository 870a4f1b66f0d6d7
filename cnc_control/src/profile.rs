//! Velocity profile synthesis and evaluation.
//!
//! A [`Profile`] is the time law of a single block: an acceleration ramp, a
//! cruise phase and a deceleration ramp. Profiles that end at rest are
//! stretched so that their duration is a whole number of sampling periods.
//!
//! ```text
//!  v
//!  │     ___________
//!  │    /           \
//!  │   /             \
//!  │__/_______________\___ t
//!     dt_accel dt_cruise dt_decel
//! ```

use cnc_common::config::ConfigError;
use cnc_common::consts::{LAMBDA_RESOLUTION, QUANTIZE_EPSILON};
use cnc_common::machine::config::Kinematics;
use serde::Serialize;
use tracing::warn;

use crate::error::ProfileError;

/// Inputs of profile synthesis. Feeds are in mm/min, as programmed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileInput {
    /// Path length [mm].
    pub length: f64,
    /// Programmed feed [mm/min].
    pub feed_nominal: f64,
    /// Feed limit [mm/min].
    pub feed_max: f64,
    /// Speed at block start [mm/min].
    pub feed_entry: f64,
    /// Speed at block end [mm/min].
    pub feed_exit: f64,
}

/// Timing of one block. Speeds in mm/s, rates in mm/s², times in s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Profile {
    pub dt_accel: f64,
    pub dt_cruise: f64,
    pub dt_decel: f64,
    pub dt_total: f64,
    /// Acceleration during the first ramp.
    pub accel: f64,
    /// Acceleration during the last ramp (≤ 0).
    pub decel: f64,
    pub f_cruise: f64,
    pub f_entry: f64,
    pub f_exit: f64,
    pub length: f64,
}

/// Snap `t` up to the next multiple of `tq`; an exact multiple stays put.
///
/// Returns the snapped time and the added remainder.
pub fn quantize(t: f64, tq: f64) -> (f64, f64) {
    let ratio = t / tq;
    let nearest = ratio.round();
    let steps = if (ratio - nearest).abs() <= QUANTIZE_EPSILON * nearest.max(1.0) {
        nearest
    } else {
        ratio.ceil()
    };
    let q = steps * tq;
    (q, (q - t).max(0.0))
}

#[inline]
fn round_lambda(r: f64) -> f64 {
    (r * LAMBDA_RESOLUTION).round() / LAMBDA_RESOLUTION
}

impl Profile {
    /// Profile of a block that does not move.
    pub const fn stationary() -> Self {
        Self {
            dt_accel: 0.0,
            dt_cruise: 0.0,
            dt_decel: 0.0,
            dt_total: 0.0,
            accel: 0.0,
            decel: 0.0,
            f_cruise: 0.0,
            f_entry: 0.0,
            f_exit: 0.0,
            length: 0.0,
        }
    }

    /// Build the velocity profile of a block.
    ///
    /// # Errors
    ///
    /// - `ProfileError::InvalidKinematics` if A, D or `tq` are not positive
    /// - `ProfileError::ZeroFeed` for a positive length with no usable feed
    pub fn synthesize(input: &ProfileInput, limits: &Kinematics) -> Result<Self, ProfileError> {
        limits.validate_rates()?;
        if !(limits.tq > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "kinematics.tq must be > 0, got {}",
                limits.tq
            ))
            .into());
        }

        let l = input.length;
        if l <= 0.0 {
            return Ok(Self::stationary());
        }

        let a_max = limits.acceleration;
        let d_max = limits.deceleration;
        let tq = limits.tq;
        let f_s = input.feed_entry.max(0.0) / 60.0;
        let f_e = input.feed_exit.max(0.0) / 60.0;
        let mut f = input.feed_nominal.min(input.feed_max) / 60.0;
        if !(f > 0.0) {
            return Err(ProfileError::ZeroFeed { length: l });
        }

        // Too short to change speed between entry and exit at the rate limits:
        // cruise at the faster end so a single-ramp case takes the whole block.
        if f > f_s && f > f_e {
            if f_s > f_e && l < (f_s * f_s - f_e * f_e) / (2.0 * d_max) {
                f = f_s;
            } else if f_e > f_s && l < (f_e * f_e - f_s * f_s) / (2.0 * a_max) {
                f = f_e;
            }
        }

        let mut a = a_max;
        let mut d = -d_max;
        let dt_1;
        let dt_m;
        let dt_2;
        let dt;

        if f > f_s && f > f_e {
            // Both ramps: trapezoid, or triangle when cruise speed is out of reach.
            let mut t1 = (f - f_s) / a_max;
            let mut t2 = (f - f_e) / d_max;
            let mut tm = l / f - (t1 * (f + f_s) + t2 * (f + f_e)) / (2.0 * f);
            if tm < 0.0 {
                let peak = ((2.0 * a_max * d_max * l + d_max * f_s * f_s + a_max * f_e * f_e)
                    / (a_max + d_max))
                    .sqrt()
                    .max(f_s)
                    .max(f_e);
                f = peak;
                t1 = (peak - f_s) / a_max;
                t2 = (peak - f_e) / d_max;
                tm = 0.0;
            }

            if f_e <= 0.0 {
                let (q, dq) = quantize(t1 + tm + t2, tq);
                if tm > 0.0 && tm >= dq {
                    // Trade dq of cruise for 2·dq of ramp: same area, ends on the grid.
                    tm -= dq;
                    t2 += 2.0 * dq;
                    d = -(f - f_e) / t2;
                } else {
                    // Triangle over the snapped duration.
                    tm = 0.0;
                    t2 = q - t1;
                    f = (2.0 * l - f_s * t1 - f_e * t2) / (t1 + t2);
                    a = if t1 > 0.0 { (f - f_s) / t1 } else { 0.0 };
                    d = -(f - f_e) / t2;
                }
                dt = q;
            } else {
                dt = t1 + tm + t2;
            }
            dt_1 = t1;
            dt_m = tm;
            dt_2 = t2;
        } else if f <= f_s && f > f_e {
            // Enters at cruise speed; deceleration ramp only.
            let mut t2 = (f - f_e) / d_max;
            let mut tm = l / f - t2 * (f + f_e) / (2.0 * f);
            if tm < 0.0 {
                warn!(
                    "Block of length {l:.3} too short to reach exit speed {f_e:.3} at D={d_max}"
                );
                tm = 0.0;
                t2 = 2.0 * l / (f + f_e);
                d = -(f - f_e) / t2;
            }
            if f_e <= 0.0 {
                let (q, dq) = quantize(tm + t2, tq);
                if tm > 0.0 && tm >= dq {
                    tm -= dq;
                    t2 += 2.0 * dq;
                    d = -(f - f_e) / t2;
                } else {
                    tm = 0.0;
                    t2 = q;
                    f = (2.0 * l - f_e * t2) / t2;
                    d = -(f - f_e) / t2;
                }
                dt = q;
            } else {
                dt = tm + t2;
            }
            a = 0.0;
            dt_1 = 0.0;
            dt_m = tm;
            dt_2 = t2;
        } else if f > f_s && f <= f_e {
            // Leaves at cruise speed; acceleration ramp only.
            let mut t1 = (f - f_s) / a_max;
            let mut tm = l / f - t1 * (f + f_s) / (2.0 * f);
            if tm < 0.0 {
                f = (f_s * f_s + 2.0 * a_max * l).sqrt();
                t1 = (f - f_s) / a_max;
                tm = 0.0;
            }
            d = 0.0;
            dt_1 = t1;
            dt_m = tm;
            dt_2 = 0.0;
            dt = t1 + tm;
        } else {
            a = 0.0;
            d = 0.0;
            dt_1 = 0.0;
            dt_m = l / f;
            dt_2 = 0.0;
            dt = dt_m;
        }

        Ok(Self {
            dt_accel: dt_1,
            dt_cruise: dt_m,
            dt_decel: dt_2,
            dt_total: dt,
            accel: a,
            decel: d,
            f_cruise: f,
            f_entry: f_s,
            f_exit: f_e,
            length: l,
        })
    }

    /// Same ramps with the total duration forced to `dt_total` (Rapid blocks).
    pub fn with_fixed_duration(self, dt_total: f64) -> Self {
        Self { dt_total, ..self }
    }

    /// Dimensionless progress λ ∈ [0, 1] at block time `t`.
    pub fn progress(&self, t: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        if t >= self.dt_total || self.length <= 0.0 {
            return 1.0;
        }
        let s = self.distance_at(t);
        round_lambda(s / self.length).clamp(0.0, 1.0)
    }

    /// Path speed [mm/s] at block time `t`.
    pub fn speed_at(&self, t: f64) -> f64 {
        let (t1, tm, t2) = (self.dt_accel, self.dt_cruise, self.dt_decel);
        if t < 0.0 || t >= t1 + tm + t2 {
            return 0.0;
        }
        if t < t1 {
            self.f_entry + self.accel * t
        } else if t < t1 + tm {
            self.f_cruise
        } else {
            self.f_cruise + self.decel * (t - t1 - tm)
        }
    }

    /// Travelled distance [mm] at block time `t` along the ramps.
    fn distance_at(&self, t: f64) -> f64 {
        let (t1, tm, t2) = (self.dt_accel, self.dt_cruise, self.dt_decel);
        let ramp_up = self.accel * t1 * t1 / 2.0 + self.f_entry * t1;
        if t < t1 {
            self.accel * t * t / 2.0 + self.f_entry * t
        } else if t < t1 + tm {
            ramp_up + self.f_cruise * (t - t1)
        } else if t < t1 + tm + t2 {
            let td = t - t1 - tm;
            ramp_up + self.f_cruise * tm + self.f_cruise * td + self.decel * td * td / 2.0
        } else {
            self.length
        }
    }
}
