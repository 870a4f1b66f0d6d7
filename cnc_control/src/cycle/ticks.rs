//! Per-tick records.
//!
//! One record per tick, in a stable field order: block number, kind,
//! cumulative time, block time, tracking error, commanded X/Y/Z, actual
//! X/Y/Z. Written either as a whitespace table or as JSON lines.

use std::io::{self, Write};

use cnc_common::machine::config::TickFormat;
use cnc_common::point::Point;
use serde::Serialize;

use crate::block::{Block, BlockKind};

/// Column header written at the start of every block in table format.
pub const TABLE_HEADER: &str = "#n type t_time b_time error x y z mx my mz";

/// One sampled tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickRecord {
    pub n: u32,
    pub kind: BlockKind,
    /// Time since the start of the run [s].
    pub time: f64,
    /// Time since the start of the block [s].
    pub block_time: f64,
    /// Tracking error after the step [mm].
    pub error: f64,
    pub lambda: f64,
    /// Profile path speed [mm/s].
    pub speed: f64,
    /// Setpoint sent to the machine, offset included.
    pub commanded: Point,
    /// Machine position after the step.
    pub actual: Point,
}

/// Sink for tick records.
pub struct TickWriter {
    out: Box<dyn Write + Send>,
    format: TickFormat,
}

impl TickWriter {
    pub fn new(out: impl Write + Send + 'static, format: TickFormat) -> Self {
        Self {
            out: Box::new(out),
            format,
        }
    }

    /// Standard output.
    pub fn stdout(format: TickFormat) -> Self {
        Self::new(io::stdout(), format)
    }

    /// Writer that discards everything.
    pub fn discard() -> Self {
        Self::new(io::sink(), TickFormat::Table)
    }

    pub fn format(&self) -> TickFormat {
        self.format
    }

    /// Called once before the first tick of `block`.
    pub fn begin_block(&mut self, _block: &Block) -> io::Result<()> {
        match self.format {
            TickFormat::Table => writeln!(self.out, "{TABLE_HEADER}"),
            TickFormat::Json => Ok(()),
        }
    }

    pub fn record(&mut self, r: &TickRecord) -> io::Result<()> {
        match self.format {
            TickFormat::Table => writeln!(
                self.out,
                "{:03} {:>6} {:10.5} {:10.5} {:10.6} {:10.4} {:10.4} {:10.4} {:10.4} {:10.4} {:10.4}",
                r.n,
                r.kind.name(),
                r.time,
                r.block_time,
                r.error,
                r.commanded.x(),
                r.commanded.y(),
                r.commanded.z(),
                r.actual.x(),
                r.actual.y(),
                r.actual.z(),
            ),
            TickFormat::Json => {
                serde_json::to_writer(&mut self.out, r)?;
                self.out.write_all(b"\n")
            }
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl std::fmt::Debug for TickWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickWriter")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
