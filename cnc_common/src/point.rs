//! Three-axis coordinates with modal inheritance.
//!
//! A [`Point`] remembers which axes were explicitly assigned. G-code lines
//! usually name only the axes that move; [`Point::inherit`] fills the rest
//! from the previous command, after which the point is fully resolved.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

bitflags! {
    /// Axes that have been explicitly assigned.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AxisMask: u8 {
        const X = 0b001;
        const Y = 0b010;
        const Z = 0b100;
    }
}

/// Cartesian coordinate in machine units [mm].
///
/// Deserializes from `{ x, y, z }` tables as a fully resolved point; every
/// omitted key defaults to 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    z: f64,
    #[serde(skip, default = "AxisMask::all")]
    set: AxisMask,
}

impl Point {
    /// Fully resolved point.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            set: AxisMask::all(),
        }
    }

    /// Fully resolved origin.
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Point with no axis assigned yet (all coordinates 0).
    pub const fn unset() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            set: AxisMask::empty(),
        }
    }

    #[inline]
    pub const fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub const fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub const fn z(&self) -> f64 {
        self.z
    }

    pub fn set_x(&mut self, value: f64) {
        self.x = value;
        self.set.insert(AxisMask::X);
    }

    pub fn set_y(&mut self, value: f64) {
        self.y = value;
        self.set.insert(AxisMask::Y);
    }

    pub fn set_z(&mut self, value: f64) {
        self.z = value;
        self.set.insert(AxisMask::Z);
    }

    /// `true` once every axis has been assigned or inherited.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.set.is_all()
    }

    /// Modal inheritance: copy from `prev` every axis not assigned here.
    ///
    /// Afterwards all three axes count as resolved.
    pub fn inherit(&mut self, prev: &Point) {
        if !self.set.contains(AxisMask::X) {
            self.x = prev.x;
        }
        if !self.set.contains(AxisMask::Y) {
            self.y = prev.y;
        }
        if !self.set.contains(AxisMask::Z) {
            self.z = prev.z;
        }
        self.set = AxisMask::all();
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        (*other - *self).norm()
    }

    /// Vector length of this point taken as a displacement.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Component-wise approximate equality.
    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        *self = *self + rhs;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k, self.z * k)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3}, {:.3}, {:.3}]", self.x, self.y, self.z)
    }
}
