//! Fixed-period cycle runner.
//!
//! [`CycleRunner`] calls [`Component::update`] once per cycle period until
//! the shared running flag is cleared or a cycle limit is reached. Deadlines
//! are absolute, so a slow cycle shortens the next sleep instead of shifting
//! the schedule.
//!
//! With the `rt` feature the loop sleeps with `clock_nanosleep` on
//! `CLOCK_MONOTONIC` and [`RtSettings::apply`] locks memory, pins the thread
//! and switches it to `SCHED_FIFO`. Without it `std::thread::sleep` paces the
//! loop and the settings are ignored.

use crate::cycle::CycleReport;
use crate::error::CycleError;
use crate::registry::Component;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Totals over the cycles a runner has executed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    /// Cycles executed.
    pub cycle_count: u64,
    /// Shortest time spent inside `update`.
    pub min_busy: Duration,
    /// Longest time spent inside `update`.
    pub max_busy: Duration,
    /// Sum of busy times.
    pub total_busy: Duration,
    /// Cycles whose busy time exceeded the period.
    pub overruns: u64,
    /// Notifications raised across all cycles.
    pub violations: u64,
    /// Cycles that raised at least one notification.
    pub violating_cycles: u64,
    /// Most axes driven in a single cycle.
    pub peak_driven: usize,
}

impl CycleStats {
    /// Fold one cycle into the totals.
    pub fn record(&mut self, busy: Duration, report: &CycleReport) {
        self.min_busy = if self.cycle_count == 0 {
            busy
        } else {
            self.min_busy.min(busy)
        };
        self.cycle_count += 1;
        self.max_busy = self.max_busy.max(busy);
        self.total_busy += busy;
        self.violations += report.violations.len() as u64;
        if !report.is_clean() {
            self.violating_cycles += 1;
        }
        self.peak_driven = self.peak_driven.max(report.driven);
    }

    /// Mean busy time, zero before the first cycle.
    pub fn mean_busy(&self) -> Duration {
        u32::try_from(self.cycle_count)
            .ok()
            .filter(|&n| n > 0)
            .map_or(Duration::ZERO, |n| self.total_busy / n)
    }
}

// ─── RT Settings ────────────────────────────────────────────────────

/// Scheduling setup for the thread that runs the cycle loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtSettings {
    /// CPU core the loop is pinned to.
    pub cpu_core: usize,
    /// `SCHED_FIFO` priority.
    pub priority: i32,
}

impl RtSettings {
    /// Lock memory, pin the calling thread and raise it to `SCHED_FIFO`.
    #[cfg(feature = "rt")]
    pub fn apply(&self) -> Result<(), CycleError> {
        use nix::sched::{CpuSet, sched_setaffinity};
        use nix::sys::mman::{MlockallFlags, mlockall};
        use nix::unistd::Pid;

        let rt = |what: &str, e: &dyn std::fmt::Display| CycleError::RtSetup(format!("{what}: {e}"));

        mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE).map_err(|e| rt("mlockall", &e))?;

        let mut cores = CpuSet::new();
        cores
            .set(self.cpu_core)
            .map_err(|e| rt(&format!("core {}", self.cpu_core), &e))?;
        sched_setaffinity(Pid::from_raw(0), &cores).map_err(|e| rt("sched_setaffinity", &e))?;

        let param = libc::sched_param {
            sched_priority: self.priority,
        };
        // SAFETY: `param` outlives the call; pid 0 is the calling thread.
        if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
            return Err(rt("sched_setscheduler", &std::io::Error::last_os_error()));
        }
        info!(core = self.cpu_core, priority = self.priority, "RT scheduling active");
        Ok(())
    }

    /// Without the `rt` feature the loop runs with normal scheduling.
    #[cfg(not(feature = "rt"))]
    pub fn apply(&self) -> Result<(), CycleError> {
        debug!(
            core = self.cpu_core,
            priority = self.priority,
            "Built without rt, keeping normal scheduling"
        );
        Ok(())
    }
}

// ─── Pacing ─────────────────────────────────────────────────────────

/// Sleeps until absolute cycle deadlines.
struct Pacer {
    period: Duration,
    #[cfg(feature = "rt")]
    deadline: nix::sys::time::TimeSpec,
    #[cfg(not(feature = "rt"))]
    deadline: Instant,
}

impl Pacer {
    #[cfg(feature = "rt")]
    fn start(period: Duration) -> Result<Self, CycleError> {
        use nix::time::{ClockId, clock_gettime};
        let deadline = clock_gettime(ClockId::CLOCK_MONOTONIC)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
        Ok(Self { period, deadline })
    }

    #[cfg(not(feature = "rt"))]
    fn start(period: Duration) -> Result<Self, CycleError> {
        Ok(Self {
            period,
            deadline: Instant::now(),
        })
    }

    #[cfg(feature = "rt")]
    fn wait(&mut self) {
        use nix::sys::time::TimeSpec;
        use nix::time::{ClockId, ClockNanosleepFlags, clock_nanosleep};
        self.deadline = self.deadline + TimeSpec::from_duration(self.period);
        // an interrupted sleep only shortens this one cycle
        let _ = clock_nanosleep(
            ClockId::CLOCK_MONOTONIC,
            ClockNanosleepFlags::TIMER_ABSTIME,
            &self.deadline,
        );
    }

    #[cfg(not(feature = "rt"))]
    fn wait(&mut self) {
        self.deadline += self.period;
        if let Some(remaining) = self.deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(remaining);
        }
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// What the runner does when a cycle takes longer than its period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrunPolicy {
    /// Count it and keep going.
    Count,
    /// End the loop with [`CycleError::CycleOverrun`].
    Abort,
}

impl Default for OverrunPolicy {
    /// Abort under the `rt` feature, count otherwise.
    fn default() -> Self {
        if cfg!(feature = "rt") { Self::Abort } else { Self::Count }
    }
}

/// Calls [`Component::update`] once per cycle period.
pub struct CycleRunner {
    component: Arc<dyn Component>,
    running: Arc<AtomicBool>,
    period: Duration,
    max_cycles: Option<u64>,
    overrun: OverrunPolicy,
    stats: CycleStats,
}

impl CycleRunner {
    /// Runner for `component` that stops once `running` is cleared.
    pub fn new(component: Arc<dyn Component>, running: Arc<AtomicBool>) -> Self {
        Self {
            period: component.cycle_time(),
            component,
            running,
            max_cycles: None,
            overrun: OverrunPolicy::default(),
            stats: CycleStats::default(),
        }
    }

    /// Stop after `cycles` cycles.
    #[must_use]
    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    /// Override the overrun handling.
    #[must_use]
    pub fn with_overrun_policy(mut self, policy: OverrunPolicy) -> Self {
        self.overrun = policy;
        self
    }

    /// Totals of the cycles run so far.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run cycles until stopped.
    pub fn run(&mut self) -> Result<(), CycleError> {
        info!(
            component = self.component.name(),
            period_us = self.period.as_micros() as u64,
            overrun = ?self.overrun,
            "Entering cycle loop"
        );
        let result = self.run_loop();
        info!(
            cycles = self.stats.cycle_count,
            mean_busy_us = self.stats.mean_busy().as_micros() as u64,
            max_busy_us = self.stats.max_busy.as_micros() as u64,
            overruns = self.stats.overruns,
            violations = self.stats.violations,
            "Cycle loop finished"
        );
        result
    }

    fn keep_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self
                .max_cycles
                .is_none_or(|max| self.stats.cycle_count < max)
    }

    fn run_loop(&mut self) -> Result<(), CycleError> {
        let mut pacer = Pacer::start(self.period)?;
        while self.keep_running() {
            let started = Instant::now();
            let report = self.component.update();
            let busy = started.elapsed();
            self.stats.record(busy, &report);

            if busy > self.period {
                self.stats.overruns += 1;
                match self.overrun {
                    OverrunPolicy::Abort => {
                        return Err(CycleError::CycleOverrun {
                            cycle: report.cycle,
                            actual: busy,
                            budget: self.period,
                        });
                    }
                    OverrunPolicy::Count => {
                        warn!(cycle = report.cycle, busy_us = busy.as_micros() as u64, "Cycle overrun");
                    }
                }
            }
            pacer.wait();
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
