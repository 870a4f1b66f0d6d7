//! Sampled-time execution: pacing, RT setup and the tick loop.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to the configured CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! Every step is a no-op unless the `rt` feature is enabled.
//!
//! ## Tick Loop
//! Tick `k` of a run is due at `origin + k·tq` on the monotonic clock, so
//! loop overhead never accumulates into drift. Each tick sends one setpoint,
//! advances the machine by `tq` and reads back the tracking error.

pub mod ticks;

use cnc_common::consts::QUANTIZE_EPSILON;
use cnc_common::machine::config::{Kinematics, Pacing};
use cnc_common::machine::driver::Machine;
use cnc_common::point::Point;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::block::BlockKind;
use crate::error::RunError;
use crate::program::Program;

pub use self::ticks::{TickRecord, TickWriter};

/// Log every n-th overrun after the first.
const OVERRUN_LOG_INTERVAL: u64 = 1000;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    /// Ticks paced so far.
    pub tick_count: u64,
    /// Work time between two waits [ns].
    pub last_body_ns: i64,
    pub min_body_ns: i64,
    pub max_body_ns: i64,
    sum_body_ns: i64,
    /// Ticks whose deadline had already passed when the wait began.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (actual minus expected wake time).
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            last_body_ns: 0,
            min_body_ns: i64::MAX,
            max_body_ns: 0,
            sum_body_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record one tick. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, body_ns: i64, latency_ns: i64) {
        self.tick_count += 1;
        self.last_body_ns = body_ns;
        self.min_body_ns = self.min_body_ns.min(body_ns);
        self.max_body_ns = self.max_body_ns.max(body_ns);
        self.sum_body_ns += body_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average body time [ns] (0 if no ticks).
    #[inline]
    pub fn avg_body_ns(&self) -> i64 {
        if self.tick_count == 0 {
            0
        } else {
            self.sum_body_ns / self.tick_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors during RT setup or pacing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Monotonic clock unavailable.
    #[error("clock error: {0}")]
    Clock(String),
}

#[cfg(feature = "rt")]
mod rt {
    use super::CycleError;
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::sys::mman::{MlockallFlags, mlockall};
    use nix::unistd::Pid;

    fn failed(call: &str, err: impl std::fmt::Display) -> CycleError {
        CycleError::RtSetup(format!("{call} failed: {err}"))
    }

    pub fn apply(cpu: usize, priority: i32) -> Result<(), CycleError> {
        mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
            .map_err(|e| failed("mlockall", e))?;

        // Touch 256 KiB of stack so the tick loop does not fault on it.
        let mut buf = [0u8; 256 * 1024];
        for byte in buf.iter_mut() {
            // SAFETY: `byte` is a valid, exclusive reference into `buf`.
            unsafe { core::ptr::write_volatile(byte, 0xFF) };
        }
        core::hint::black_box(&buf);

        let mut cpuset = CpuSet::new();
        cpuset.set(cpu).map_err(|e| failed("CpuSet::set", e))?;
        sched_setaffinity(Pid::from_raw(0), &cpuset).map_err(|e| failed("sched_setaffinity", e))?;

        let param = libc::sched_param {
            sched_priority: priority,
        };
        // SAFETY: `param` outlives the call; pid 0 is the calling thread.
        if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
            return Err(failed("sched_setscheduler", std::io::Error::last_os_error()));
        }
        Ok(())
    }
}

#[cfg(not(feature = "rt"))]
mod rt {
    use super::CycleError;

    pub fn apply(_cpu: usize, _priority: i32) -> Result<(), CycleError> {
        Ok(())
    }
}

/// Full RT setup sequence; call once before the first run.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt::apply(cpu_core, rt_priority)?;
    if cfg!(feature = "rt") {
        info!("RT setup complete: cpu {cpu_core}, SCHED_FIFO {rt_priority}");
    } else {
        debug!("RT setup skipped (built without the rt feature)");
    }
    Ok(())
}

// ─── Clock ──────────────────────────────────────────────────────────

#[cfg(feature = "rt")]
mod clock {
    use super::CycleError;
    use nix::sys::time::TimeSpec;
    use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

    const CLOCK: ClockId = ClockId::CLOCK_MONOTONIC;

    #[derive(Debug, Clone, Copy)]
    pub struct Stamp(TimeSpec);

    pub fn now() -> Result<Stamp, CycleError> {
        clock_gettime(CLOCK)
            .map(Stamp)
            .map_err(|e| CycleError::Clock(format!("clock_gettime: {e}")))
    }

    /// Sleep on the absolute deadline; an interrupted sleep just wakes early.
    pub fn sleep_until(deadline: Stamp) {
        let _ = clock_nanosleep(CLOCK, ClockNanosleepFlags::TIMER_ABSTIME, &deadline.0);
    }

    impl Stamp {
        pub fn add_ns(self, ns: i64) -> Self {
            let mut secs = self.0.tv_sec();
            let mut nanos = self.0.tv_nsec() + ns;
            secs += nanos.div_euclid(1_000_000_000);
            nanos = nanos.rem_euclid(1_000_000_000);
            Stamp(TimeSpec::new(secs, nanos))
        }

        /// `self - earlier` [ns].
        pub fn since_ns(&self, earlier: &Stamp) -> i64 {
            (self.0.tv_sec() - earlier.0.tv_sec()) * 1_000_000_000
                + (self.0.tv_nsec() - earlier.0.tv_nsec())
        }
    }
}

#[cfg(not(feature = "rt"))]
mod clock {
    use super::CycleError;
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, Copy)]
    pub struct Stamp(Instant);

    pub fn now() -> Result<Stamp, CycleError> {
        Ok(Stamp(Instant::now()))
    }

    pub fn sleep_until(deadline: Stamp) {
        if let Some(remaining) = deadline.0.checked_duration_since(Instant::now()) {
            std::thread::sleep(remaining);
        }
    }

    impl Stamp {
        pub fn add_ns(self, ns: i64) -> Self {
            Stamp(self.0 + Duration::from_nanos(ns.max(0) as u64))
        }

        /// `self - earlier` [ns], negative when `earlier` is later.
        pub fn since_ns(&self, earlier: &Stamp) -> i64 {
            match self.0.checked_duration_since(earlier.0) {
                Some(d) => d.as_nanos() as i64,
                None => -(earlier.0.duration_since(self.0).as_nanos() as i64),
            }
        }
    }
}

// ─── Pacer ──────────────────────────────────────────────────────────

/// Absolute-deadline tick pacing.
#[derive(Debug)]
pub struct Pacer {
    pacing: Pacing,
    period_ns: i64,
    tick: u64,
    origin: Option<clock::Stamp>,
    last_wake: Option<clock::Stamp>,
    stats: CycleStats,
}

impl Pacer {
    /// Pacer with period `tq` seconds.
    pub fn new(pacing: Pacing, tq: f64) -> Self {
        Self {
            pacing,
            period_ns: (tq * 1e9).round() as i64,
            tick: 0,
            origin: None,
            last_wake: None,
            stats: CycleStats::new(),
        }
    }

    /// Pacer that never sleeps.
    pub fn unpaced(tq: f64) -> Self {
        Self::new(Pacing::Unpaced, tq)
    }

    /// Start a new run: the next tick is due immediately.
    pub fn restart(&mut self) -> Result<(), CycleError> {
        self.tick = 0;
        self.last_wake = None;
        self.origin = match self.pacing {
            Pacing::Realtime => Some(clock::now()?),
            Pacing::Unpaced => None,
        };
        Ok(())
    }

    /// Block until the next tick deadline.
    pub fn wait_next(&mut self) -> Result<(), CycleError> {
        let Some(origin) = self.origin else {
            self.tick += 1;
            self.stats.record(0, 0);
            return Ok(());
        };

        let deadline = origin.add_ns(self.tick as i64 * self.period_ns);
        let before = clock::now()?;
        let body_ns = self.last_wake.map_or(0, |w| before.since_ns(&w));
        if before.since_ns(&deadline) > 0 {
            self.stats.overruns += 1;
            if self.stats.overruns == 1 || self.stats.overruns % OVERRUN_LOG_INTERVAL == 0 {
                warn!(
                    "Tick {} overran its deadline by {} ns ({} overruns)",
                    self.tick,
                    before.since_ns(&deadline),
                    self.stats.overruns
                );
            }
        } else {
            clock::sleep_until(deadline);
        }

        let woke = clock::now()?;
        self.stats.record(body_ns, woke.since_ns(&deadline).max(0));
        self.last_wake = Some(woke);
        self.tick += 1;
        Ok(())
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }
}

// ─── Tick Loop ──────────────────────────────────────────────────────

/// Outcome of one pass over a program.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub blocks_executed: usize,
    pub blocks_skipped: usize,
    pub offsets_applied: usize,
    /// Cumulative run time [s].
    pub elapsed: f64,
}

/// Number of the last tick of a block lasting `dt_total`.
fn last_tick(dt_total: f64, tq: f64) -> u64 {
    (dt_total / tq + QUANTIZE_EPSILON).floor().max(0.0) as u64
}

/// Drive every block of `program` through `machine`.
///
/// Arc blocks are skipped with a warning; offset blocks update `offset`
/// immediately. Rapid blocks end early once the tracking error is within
/// `limits.max_error`.
///
/// # Errors
///
/// Any machine, pacing or tick-sink failure aborts the run.
pub fn run_program(
    program: &Program,
    machine: &mut dyn Machine,
    offset: &mut Point,
    limits: &Kinematics,
    pacer: &mut Pacer,
    ticks: &mut TickWriter,
) -> Result<RunSummary, RunError> {
    let tq = limits.tq;
    let mut summary = RunSummary::default();
    pacer.restart()?;

    for block in program {
        match block.kind {
            BlockKind::ArcCw | BlockKind::ArcCcw => {
                warn!("Skipping block {:03}: arc interpolation is not executed", block.n);
                summary.blocks_skipped += 1;
                continue;
            }
            BlockKind::NoMotion => {
                warn!("Skipping block {:03}: unsupported command '{}'", block.n, block.source_text);
                summary.blocks_skipped += 1;
                continue;
            }
            BlockKind::SetOffset => {
                *offset += block.offset;
                info!("Block {:03}: offset shifted to {}", block.n, offset);
                summary.offsets_applied += 1;
                continue;
            }
            BlockKind::ClearOffset => {
                *offset = Point::origin();
                info!("Block {:03}: offset cleared", block.n);
                summary.offsets_applied += 1;
                continue;
            }
            BlockKind::Rapid | BlockKind::Line => {}
        }

        info!("{block}");
        ticks.begin_block(block)?;

        let rapid = block.kind == BlockKind::Rapid;
        for k in 0..=last_tick(block.profile.dt_total, tq) {
            pacer.wait_next()?;

            let block_time = k as f64 * tq;
            let lambda = block.progress(block_time);
            let position = if rapid {
                block.target
            } else {
                block.interpolate(lambda)
            };
            let setpoint = position + *offset;

            machine.go_to(setpoint)?;
            machine.do_step(tq)?;
            let error = machine.error();

            ticks.record(&TickRecord {
                n: block.n,
                kind: block.kind,
                time: summary.ticks as f64 * tq,
                block_time,
                error,
                lambda,
                speed: block.profile.speed_at(block_time),
                commanded: setpoint,
                actual: machine.position(),
            })?;
            summary.ticks += 1;

            if rapid && error <= limits.max_error {
                debug!("Block {:03}: rapid settled after {} ticks", block.n, k + 1);
                break;
            }
        }
        summary.blocks_executed += 1;
    }

    ticks.flush()?;
    summary.elapsed = summary.ticks as f64 * tq;
    let stats = pacer.stats();
    info!(
        "Run complete: {} blocks, {} skipped, {} ticks ({:.3} s), {} overruns",
        summary.blocks_executed,
        summary.blocks_skipped,
        summary.ticks,
        summary.elapsed,
        stats.overruns
    );
    if pacer.pacing() == Pacing::Realtime {
        debug!(
            "Tick body min/avg/max {}/{}/{} ns, max wake latency {} ns",
            stats.min_body_ns,
            stats.avg_body_ns(),
            stats.max_body_ns,
            stats.max_latency_ns
        );
    }
    Ok(summary)
}

// ─── Tests ──────────────────────────────────────────────────────────
