//! Arc resolution and corner angles.

use std::f64::consts::PI;

use cnc_common::consts::{ARC_RADIUS_TOLERANCE, FULL_TURN};
use cnc_common::point::Point;
use tracing::warn;

use super::{ArcSpec, Block};
use crate::error::GeometryError;

/// Resolved planar arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    /// Absolute centre; z follows the start point.
    pub center: Point,
    /// Signed radius: positive when the sweep is at most half a turn.
    pub radius: f64,
    /// Angle of the start point around the centre, in `[0, 2π)`.
    pub start_angle: f64,
    /// Signed sweep: positive counter-clockwise, negative clockwise.
    pub sweep: f64,
}

impl Arc {
    /// Path length in the XY plane.
    pub fn length(&self) -> f64 {
        self.sweep.abs() * self.radius.abs()
    }
}

fn normalized_angle(dy: f64, dx: f64) -> f64 {
    let a = dy.atan2(dx);
    if a < 0.0 { a + FULL_TURN } else { a }
}

/// Resolve centre, radius and sweep of an arc from `start` to `target`.
///
/// `clockwise` selects G2 over G3. With `R`, a positive radius takes the
/// short way around and a negative one the long way.
///
/// Centre and radius are never carried over from a previous arc: a modal
/// continuation line such as `X0 Y0` after a `G2`/`G3` must restate I/J or R.
///
/// # Errors
///
/// - `GeometryError::MissingArcSpec` when neither I/J nor R was given on this line
/// - `GeometryError::DegenerateArc` when |R| is below half the chord, or I/J is zero
/// - `GeometryError::CoincidentEndpoints` for an R arc that starts where it ends
pub fn resolve_arc(
    start: &Point,
    target: &Point,
    spec: ArcSpec,
    clockwise: bool,
) -> Result<Arc, GeometryError> {
    let (xf, yf) = (start.x(), start.y());
    let (xt, yt) = (target.x(), target.y());

    let (cx, cy, magnitude, given_radius) = match spec {
        ArcSpec::None => return Err(GeometryError::MissingArcSpec),
        ArcSpec::Center { i, j } => {
            let r = i.hypot(j);
            if r == 0.0 {
                return Err(GeometryError::DegenerateArc {
                    radius: 0.0,
                    half_chord: (xt - xf).hypot(yt - yf) / 2.0,
                });
            }
            let (cx, cy) = (xf + i, yf + j);
            let end_radius = (xt - cx).hypot(yt - cy);
            if (end_radius - r).abs() > ARC_RADIUS_TOLERANCE {
                warn!(
                    "Arc end radius {end_radius:.4} differs from start radius {r:.4} by more than {ARC_RADIUS_TOLERANCE}"
                );
            }
            (cx, cy, r, None)
        }
        ArcSpec::Radius(r) => {
            let d = (xf - xt).hypot(yf - yt);
            if d == 0.0 {
                return Err(GeometryError::CoincidentEndpoints { radius: r });
            }
            let l = d / 2.0;
            let h_sq = r * r - l * l;
            let h = if h_sq >= 0.0 {
                h_sq.sqrt()
            } else if (l - r.abs()) <= 1e-9 * l.max(1.0) {
                0.0
            } else {
                return Err(GeometryError::DegenerateArc {
                    radius: r,
                    half_chord: l,
                });
            };
            let s = r.signum() * if clockwise { 1.0 } else { -1.0 };
            let cx = l / d * (xt - xf) + s * h / d * (yt - yf) + xf;
            let cy = l / d * (yt - yf) - s * h / d * (xt - xf) + yf;
            (cx, cy, r.abs(), Some(r))
        }
    };

    let start_angle = normalized_angle(yf - cy, xf - cx);
    let end_angle = normalized_angle(yt - cy, xt - cx);

    let sweep = if clockwise {
        let s = (start_angle - end_angle).rem_euclid(FULL_TURN);
        if s <= f64::EPSILON { -FULL_TURN } else { -s }
    } else {
        let s = (end_angle - start_angle).rem_euclid(FULL_TURN);
        if s <= f64::EPSILON { FULL_TURN } else { s }
    };

    let radius = given_radius.unwrap_or(if sweep.abs() <= PI {
        magnitude
    } else {
        -magnitude
    });

    Ok(Arc {
        center: Point::new(cx, cy, start.z()),
        radius,
        start_angle,
        sweep,
    })
}

/// Unit-free travel direction where `block` starts.
fn entry_direction(block: &Block) -> Point {
    if block.kind.is_arc() {
        tangent(&block.start, &block.center, block.sweep)
    } else {
        block.target - block.start
    }
}

/// Unit-free travel direction where `block` ends.
fn exit_direction(block: &Block) -> Point {
    if block.kind.is_arc() {
        tangent(&block.target, &block.center, block.sweep)
    } else {
        block.target - block.start
    }
}

/// XY tangent at `p` on a circle around `center`, oriented by the sweep sign.
fn tangent(p: &Point, center: &Point, sweep: f64) -> Point {
    let (rx, ry) = (p.x() - center.x(), p.y() - center.y());
    if sweep >= 0.0 {
        Point::new(-ry, rx, 0.0)
    } else {
        Point::new(ry, -rx, 0.0)
    }
}

fn angle_between(u: &Point, v: &Point) -> Option<f64> {
    let (nu, nv) = (u.norm(), v.norm());
    if nu == 0.0 || nv == 0.0 {
        return None;
    }
    let dot = u.x() * v.x() + u.y() * v.y() + u.z() * v.z();
    Some((dot / (nu * nv)).clamp(-1.0, 1.0).acos())
}

/// Corner angle between `prev` and `curr`, in `[0, π]`.
///
/// `π` means straight through, `0` a full reversal. Missing predecessor,
/// unresolved endpoints or a zero-length block yield `π`.
pub fn corner_angle(prev: Option<&Block>, curr: &Block) -> f64 {
    let Some(prev) = prev else {
        return PI;
    };
    if !prev.start.is_resolved() || !prev.target.is_resolved() || !curr.target.is_resolved() {
        return PI;
    }
    if prev.length == 0.0 || curr.length == 0.0 {
        return PI;
    }

    let (out, into) = match (prev.kind.is_arc(), curr.kind.is_arc()) {
        // line → line: raw segment directions
        (false, false) => (prev.target - prev.start, curr.target - curr.start),
        // arc → line: tangent at the arc end
        (true, false) => (exit_direction(prev), curr.target - curr.start),
        // line → arc: tangent at the arc start
        (false, true) => (prev.target - prev.start, entry_direction(curr)),
        // arc → arc
        (true, true) => (exit_direction(prev), entry_direction(curr)),
    };

    match angle_between(&out, &into) {
        Some(deviation) => PI - deviation,
        None => PI,
    }
}
