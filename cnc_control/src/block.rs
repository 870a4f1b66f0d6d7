//! G-code blocks.
//!
//! A [`Block`] is one program line resolved against its predecessor: modal
//! fields are carried over, the target is completed by modal inheritance,
//! arc geometry and corner angle are computed, and the velocity profile is
//! synthesized once. After [`Block::parse`] returns, a block never changes
//! except for its links inside the owning program.

pub mod geometry;
pub mod tokenizer;

use std::fmt;

use cnc_common::machine::config::Kinematics;
use cnc_common::point::Point;
use serde::Serialize;
use tracing::debug;

use crate::error::{BlockError, ParseError};
use crate::profile::{Profile, ProfileInput};
use crate::program::BlockId;

// ─── Block Kind ─────────────────────────────────────────────────────

/// Motion type selected by the `G` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BlockKind {
    /// G0: move to target as fast as possible.
    Rapid = 0,
    /// G1: straight feed move.
    Line = 1,
    /// G2: clockwise arc.
    ArcCw = 2,
    /// G3: counter-clockwise arc.
    ArcCcw = 3,
    /// G92: shift the work offset.
    SetOffset = 4,
    /// G92.1: clear the work offset.
    ClearOffset = 5,
    /// Anything else; the target is updated without motion.
    #[default]
    NoMotion = 6,
}

impl BlockKind {
    /// Convert from u8.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Rapid),
            1 => Some(Self::Line),
            2 => Some(Self::ArcCw),
            3 => Some(Self::ArcCcw),
            4 => Some(Self::SetOffset),
            5 => Some(Self::ClearOffset),
            6 => Some(Self::NoMotion),
            _ => None,
        }
    }

    /// Map a `G` argument to a kind. Unknown codes fall back to `NoMotion`.
    pub fn from_g_code(code: f64) -> Self {
        match (code * 10.0).round() as i64 {
            0 => Self::Rapid,
            10 => Self::Line,
            20 => Self::ArcCw,
            30 => Self::ArcCcw,
            920 => Self::SetOffset,
            921 => Self::ClearOffset,
            _ => {
                debug!("Unsupported G{code}, treated as no motion");
                Self::NoMotion
            }
        }
    }

    #[inline]
    pub const fn is_arc(self) -> bool {
        matches!(self, Self::ArcCw | Self::ArcCcw)
    }

    /// Offset words apply once and do not change the modal motion kind.
    #[inline]
    pub const fn is_modal(self) -> bool {
        !matches!(self, Self::SetOffset | Self::ClearOffset)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rapid => "rapid",
            Self::Line => "line",
            Self::ArcCw => "arc_cw",
            Self::ArcCcw => "arc_ccw",
            Self::SetOffset => "set_offset",
            Self::ClearOffset => "clear_offset",
            Self::NoMotion => "no_motion",
        }
    }
}

/// Arc specification as programmed; the later of I/J and R wins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ArcSpec {
    #[default]
    None,
    /// Centre offset from the start point.
    Center { i: f64, j: f64 },
    /// Signed radius.
    Radius(f64),
}

// ─── Block ──────────────────────────────────────────────────────────

/// One parsed and resolved G-code line.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Sequence number (`N`), or predecessor's + 1.
    pub n: u32,
    pub kind: BlockKind,
    /// Line as read from the program.
    pub source_text: String,

    /// Where the block starts: predecessor's target, or the origin.
    pub start: Point,
    pub target: Point,
    /// Absolute arc centre (origin for non-arcs).
    pub center: Point,
    /// `target - start`.
    pub delta: Point,
    /// Offset shift carried by a `SetOffset` block.
    pub offset: Point,

    pub arc: ArcSpec,
    /// Signed arc radius, 0 for non-arcs.
    pub radius: f64,
    /// Arc start angle [rad].
    pub start_angle: f64,
    /// Signed arc sweep [rad], CCW positive.
    pub sweep: f64,
    /// Path length [mm].
    pub length: f64,
    /// Corner angle against the predecessor [rad].
    pub corner_angle: f64,

    /// Programmed feed [mm/min].
    pub feed_nominal: f64,
    /// Feed limit [mm/min].
    pub feed_max: f64,
    pub feed_entry: f64,
    pub feed_exit: f64,
    pub spindle: f64,
    pub tool: u32,

    pub profile: Profile,

    /// Motion kind inherited by the next line without a `G` word.
    modal_kind: BlockKind,

    pub(crate) prev: Option<BlockId>,
    pub(crate) next: Option<BlockId>,
}

fn parse_number(letter: char, argument: &str) -> Result<f64, ParseError> {
    let value: f64 = argument
        .parse()
        .map_err(|_| ParseError::new(letter, format!("'{argument}' is not a number")))?;
    if !value.is_finite() {
        return Err(ParseError::new(letter, format!("'{argument}' is not finite")));
    }
    Ok(value)
}

fn parse_unsigned(letter: char, argument: &str) -> Result<u32, ParseError> {
    argument
        .parse()
        .map_err(|_| ParseError::new(letter, format!("'{argument}' is not an unsigned integer")))
}

impl Block {
    /// Parse `line` as the successor of `prev`.
    ///
    /// # Errors
    ///
    /// - `BlockError::Parse` for an unknown letter or malformed argument
    /// - `BlockError::Geometry` for an unresolvable arc
    /// - `BlockError::Profile` for unusable kinematics or a feed move without feed
    pub fn parse(line: &str, prev: Option<&Block>, limits: &Kinematics) -> Result<Self, BlockError> {
        let mut block = Self::successor_of(prev, line, limits);

        for word in tokenizer::words(line)? {
            block.set_field(word.letter, word.argument)?;
        }

        block.resolve(prev, limits)?;
        Ok(block)
    }

    /// Fresh block with the modal fields of `prev`.
    fn successor_of(prev: Option<&Block>, line: &str, limits: &Kinematics) -> Self {
        let (n, kind, feed, spindle, tool) = match prev {
            // Implicit numbering stops at u32::MAX.
            Some(p) => (
                p.n.saturating_add(1),
                p.modal_kind,
                p.feed_nominal,
                p.spindle,
                p.tool,
            ),
            None => (0, BlockKind::NoMotion, 0.0, 0.0, 0),
        };
        Self {
            n,
            kind,
            source_text: line.trim_end().to_string(),
            start: Point::origin(),
            target: Point::unset(),
            center: Point::origin(),
            delta: Point::origin(),
            offset: Point::origin(),
            arc: ArcSpec::None,
            radius: 0.0,
            start_angle: 0.0,
            sweep: 0.0,
            length: 0.0,
            corner_angle: std::f64::consts::PI,
            feed_nominal: feed,
            feed_max: limits.feed_max,
            feed_entry: 0.0,
            feed_exit: 0.0,
            spindle,
            tool,
            profile: Profile::stationary(),
            modal_kind: kind,
            prev: None,
            next: None,
        }
    }

    fn set_field(&mut self, letter: char, argument: &str) -> Result<(), ParseError> {
        match letter {
            'N' => self.n = parse_unsigned(letter, argument)?,
            'G' => {
                let kind = BlockKind::from_g_code(parse_number(letter, argument)?);
                self.kind = kind;
                if kind.is_modal() {
                    self.modal_kind = kind;
                }
            }
            'X' => self.target.set_x(parse_number(letter, argument)?),
            'Y' => self.target.set_y(parse_number(letter, argument)?),
            'Z' => self.target.set_z(parse_number(letter, argument)?),
            'F' => {
                let feed = parse_number(letter, argument)?;
                if feed < 0.0 {
                    return Err(ParseError::new(letter, "feed rate must not be negative"));
                }
                self.feed_nominal = feed;
            }
            'S' => self.spindle = parse_number(letter, argument)?,
            'T' => self.tool = parse_unsigned(letter, argument)?,
            'I' | 'J' => {
                let value = parse_number(letter, argument)?;
                let (mut i, mut j) = match self.arc {
                    ArcSpec::Center { i, j } => (i, j),
                    _ => (0.0, 0.0),
                };
                if letter == 'I' {
                    i = value;
                } else {
                    j = value;
                }
                self.arc = ArcSpec::Center { i, j };
            }
            'R' => self.arc = ArcSpec::Radius(parse_number(letter, argument)?),
            _ => return Err(ParseError::new(letter, "unknown command letter")),
        }
        Ok(())
    }

    /// Modal inheritance, geometry, corner angle and profile.
    fn resolve(&mut self, prev: Option<&Block>, limits: &Kinematics) -> Result<(), BlockError> {
        self.start = prev.map_or(Point::origin(), |p| p.target);

        match self.kind {
            BlockKind::SetOffset => {
                // Axis words are the offset shift; omitted axes shift by 0.
                let mut shift = self.target;
                shift.inherit(&Point::origin());
                self.offset = shift;
                self.target = Point::unset();
            }
            BlockKind::ClearOffset => self.target = Point::unset(),
            _ => {}
        }
        self.target.inherit(&self.start);
        self.delta = self.target - self.start;

        match self.kind {
            BlockKind::Rapid | BlockKind::Line => {
                self.length = self.start.distance(&self.target);
            }
            BlockKind::ArcCw | BlockKind::ArcCcw => {
                let arc = geometry::resolve_arc(
                    &self.start,
                    &self.target,
                    self.arc,
                    self.kind == BlockKind::ArcCw,
                )?;
                self.center = arc.center;
                self.radius = arc.radius;
                self.start_angle = arc.start_angle;
                self.sweep = arc.sweep;
                self.length = arc.length();
            }
            BlockKind::SetOffset | BlockKind::ClearOffset | BlockKind::NoMotion => {}
        }

        self.corner_angle = geometry::corner_angle(prev, self);

        let feed_nominal = if self.kind == BlockKind::Rapid {
            self.feed_max
        } else {
            self.feed_nominal
        };
        let profile = Profile::synthesize(
            &ProfileInput {
                length: self.length,
                feed_nominal,
                feed_max: self.feed_max,
                feed_entry: self.feed_entry,
                feed_exit: self.feed_exit,
            },
            limits,
        )?;
        self.profile = if self.kind == BlockKind::Rapid {
            profile.with_fixed_duration(limits.rapid_duration)
        } else {
            profile
        };
        Ok(())
    }

    /// Progress λ ∈ [0, 1] at block time `t`.
    #[inline]
    pub fn progress(&self, t: f64) -> f64 {
        self.profile.progress(t)
    }

    /// Absolute position at progress `lambda`.
    pub fn interpolate(&self, lambda: f64) -> Point {
        if self.kind.is_arc() {
            let angle = self.start_angle + self.sweep * lambda;
            let r = self.radius.abs();
            Point::new(
                self.center.x() + r * angle.cos(),
                self.center.y() + r * angle.sin(),
                self.start.z() + self.delta.z() * lambda,
            )
        } else {
            self.start + self.delta * lambda
        }
    }

    /// Previous block in the owning program.
    pub fn prev_id(&self) -> Option<BlockId> {
        self.prev
    }

    /// Next block in the owning program.
    pub fn next_id(&self) -> Option<BlockId> {
        self.next
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:03}: {} -> {} F{:7.1},{:7.1},{:7.1} S{:7.1} T{:02} ({})",
            self.n,
            self.start,
            self.target,
            self.feed_entry,
            self.feed_nominal,
            self.feed_exit,
            self.spindle,
            self.tool,
            self.kind.name(),
        )?;
        let (i, j) = match self.arc {
            ArcSpec::Center { i, j } => (i, j),
            _ => (self.center.x() - self.start.x(), self.center.y() - self.start.y()),
        };
        write!(
            f,
            "  IJR[{:8.3} {:8.3} {:8.3}] L{:8.3} Delta[{:8.3} {:8.3} {:8.3}] {:6.1}°",
            i,
            j,
            self.radius,
            self.length,
            self.delta.x(),
            self.delta.y(),
            self.delta.z(),
            self.corner_angle.to_degrees(),
        )
    }
}
