//! The manipulator controller: construction, shared state and teardown.
//!
//! A controller owns a fixed set of axes, each behind its own mutex so a
//! command and the control cycle never interleave on the same axis. The
//! command surface lives in [`crate::dispatch`], the periodic entry point in
//! [`crate::cycle`].

use crate::error::ControllerError;
use crate::ports::{AxisPorts, ValuePort};
use crate::safety::EventBus;
use axion_common::config::{ConfigError, ConfigStore};
use axion_common::consts::MAX_AXES;
use axion_common::prelude::*;
use axion_hal::drivers::simulation::plant_from_config;
use axion_hal::drivers::{AxisSetConfig, build_axes};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ─── Per-Axis State ─────────────────────────────────────────────────

/// Everything the controller keeps for one axis.
pub(crate) struct AxisSlot {
    pub(crate) axis: Mutex<Box<dyn Axis>>,
    pub(crate) ports: AxisPorts,
    /// Accumulated drive offset, added to velocity commands.
    pub(crate) drive_offset: ValuePort,
    pub(crate) limits: AxisLimits,
    pub(crate) torque_controlled: bool,
}

/// Buffers handed to the plant model once per cycle.
#[derive(Debug, Default)]
pub(crate) struct PlantScratch {
    pub(crate) torque: [f64; MAX_AXES],
    pub(crate) velocity: [f64; MAX_AXES],
    pub(crate) position: [f64; MAX_AXES],
    pub(crate) acceleration: [f64; MAX_AXES],
}

/// State owned by whichever thread is running a cycle.
#[derive(Debug, Default)]
pub(crate) struct CycleState {
    pub(crate) scratch: PlantScratch,
    pub(crate) count: u64,
}

/// Stop `axis` if driven, then lock it if stopped.
pub(crate) fn park(axis: &mut dyn Axis) -> Result<(), HalError> {
    if axis.is_driven() {
        axis.stop()?;
    }
    if axis.is_stopped() {
        axis.lock()?;
    }
    Ok(())
}

// ─── Controller ─────────────────────────────────────────────────────

/// Supervisory controller for one manipulator.
///
/// All methods take `&self`; share it as `Arc<ManipulatorController>`
/// between the cycle thread and command callers.
pub struct ManipulatorController {
    pub(crate) name: String,
    config_path: Option<PathBuf>,
    /// Configuration as loaded; drive offsets are taken from the slots when
    /// it is written back.
    config: ControllerConfig,
    config_loaded: bool,
    calibration: CalibrationTable,
    pub(crate) slots: Vec<AxisSlot>,
    pub(crate) variant: AxisVariant,
    pub(crate) io: Option<Arc<dyn IoBackend>>,
    pub(crate) layout: IoLayout,
    pub(crate) plant: Option<Box<dyn PlantDynamics>>,
    pub(crate) cycle: Mutex<CycleState>,
    pub(crate) activated: AtomicBool,
    pub(crate) events: EventBus,
    cycle_time: Duration,
    shut_down: AtomicBool,
}

static_assertions::assert_impl_all!(ManipulatorController: Send, Sync);

impl std::fmt::Debug for ManipulatorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManipulatorController")
            .field("name", &self.name)
            .field("axes", &self.slots.len())
            .field("variant", &self.variant)
            .field("activated", &self.is_activated())
            .finish_non_exhaustive()
    }
}

impl ManipulatorController {
    /// Start building a controller called `name`.
    pub fn builder(name: impl Into<String>) -> ControllerBuilder {
        ControllerBuilder::new(name)
    }

    /// Build from a property file, as the component registry does.
    pub fn from_config_file(name: &str, path: &Path) -> Result<Self, ControllerError> {
        Self::builder(name).config_file(path).build()
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of axes, fixed at construction.
    pub fn axis_count(&self) -> usize {
        self.slots.len()
    }

    /// Published values and drive input of axis `axis`.
    pub fn ports(&self, axis: usize) -> Option<&AxisPorts> {
        self.slots.get(axis).map(|slot| &slot.ports)
    }

    /// Current drive offset of axis `axis`.
    pub fn drive_offset(&self, axis: usize) -> Option<f64> {
        self.slots.get(axis).map(|slot| slot.drive_offset.get())
    }

    /// Safety envelope of axis `axis`.
    pub fn limits(&self, axis: usize) -> Option<&AxisLimits> {
        self.slots.get(axis).map(|slot| &slot.limits)
    }

    /// Calibration in use.
    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    /// True when the axes are simulated.
    pub fn simulation(&self) -> bool {
        self.variant == AxisVariant::Simulated
    }

    /// Axis variant chosen at construction.
    pub fn variant(&self) -> AxisVariant {
        self.variant
    }

    /// Cycle period.
    pub fn cycle_time(&self) -> Duration {
        self.cycle_time
    }

    /// Cycles run so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycle.lock().count
    }

    /// True between prepare-for-use and prepare-for-shutdown.
    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    /// Notification bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to out-of-range notifications.
    pub fn subscribe(&self) -> Receiver<Notification> {
        self.events.subscribe()
    }

    /// Run `f` on axis `axis` under its lock.
    pub(crate) fn with_axis<R>(&self, axis: usize, f: impl FnOnce(&mut dyn Axis) -> R) -> Option<R> {
        self.slots.get(axis).map(|slot| f(&mut **slot.axis.lock()))
    }

    /// Stop every driven axis and lock every stopped one.
    ///
    /// Cannot fail: problems are logged and the next axis is handled.
    pub fn force_safe_state(&self) {
        for (index, slot) in self.slots.iter().enumerate() {
            if let Err(e) = park(&mut **slot.axis.lock()) {
                error!(axis = index, error = %e, "Forcing safe state failed");
            }
        }
        debug!(controller = %self.name, "Axes forced to safe state");
    }

    /// Switch the interlock relays. No-op for simulated axes.
    pub(crate) fn set_interlock(&self, on: bool) -> Result<(), HalError> {
        let Some(io) = &self.io else {
            return Ok(());
        };
        for channel in self.layout.interlock_outputs {
            io.write_digital(channel, on)?;
        }
        Ok(())
    }

    /// Configuration with the current drive offsets.
    pub fn snapshot(&self) -> ControllerConfig {
        let mut config = self.config.clone();
        config.axes = self
            .slots
            .iter()
            .map(|slot| AxisLimits {
                drive_offset: slot.drive_offset.get(),
                ..slot.limits
            })
            .collect();
        config
    }

    /// Write the configuration back to its file.
    ///
    /// Skipped when the controller has no file or when the file could not
    /// be loaded, so a broken file is never replaced by defaults.
    pub fn persist(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.config_path else {
            debug!(controller = %self.name, "No property file, nothing to persist");
            return Ok(());
        };
        if !self.config_loaded {
            warn!(
                path = %path.display(),
                "Property file was not loaded, not overwriting it"
            );
            return Ok(());
        }
        self.snapshot().store(path)?;
        info!(path = %path.display(), "Configuration persisted");
        Ok(())
    }

    /// Bring the controller down: safe state, relays off, configuration
    /// written back. Runs once; later calls do nothing.
    pub fn shutdown(&self) -> Result<(), ConfigError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(controller = %self.name, "Shutting down");
        self.force_safe_state();
        if let Err(e) = self.set_interlock(false) {
            error!(error = %e, "Releasing interlock failed");
        }
        self.activated.store(false, Ordering::Release);
        self.persist()
    }
}

impl Drop for ManipulatorController {
    /// Leave nothing energized: park every axis, open the interlock and
    /// revoke activation. Skipped after [`ManipulatorController::shutdown`].
    fn drop(&mut self) {
        if self.shut_down.load(Ordering::Acquire) {
            return;
        }
        self.force_safe_state();
        if let Err(e) = self.set_interlock(false) {
            error!(controller = %self.name, error = %e, "Releasing interlock on drop failed");
        }
        self.activated.store(false, Ordering::Release);
    }
}

// ─── Builder ────────────────────────────────────────────────────────

/// Assembles a [`ManipulatorController`].
///
/// Without a property file or explicit configuration the controller uses
/// defaults; without an explicit calibration it uses the file named by the
/// configuration or the reference arm.
#[must_use]
pub struct ControllerBuilder {
    name: String,
    config_path: Option<PathBuf>,
    config: Option<ControllerConfig>,
    calibration: Option<CalibrationTable>,
    io: Option<Arc<dyn IoBackend>>,
}

impl ControllerBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_path: None,
            config: None,
            calibration: None,
            io: None,
        }
    }

    /// Property file read at build and written at shutdown.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use `config` instead of reading the property file.
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `calibration` instead of the configured one.
    pub fn calibration(mut self, calibration: CalibrationTable) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Backend for hardware axes.
    pub fn io(mut self, io: Arc<dyn IoBackend>) -> Self {
        self.io = Some(io);
        self
    }

    /// Build the controller. Every axis starts locked.
    pub fn build(self) -> Result<ManipulatorController, ControllerError> {
        let (config, config_loaded) = match (self.config, &self.config_path) {
            (Some(config), _) => {
                config.validate()?;
                (config, true)
            }
            (None, Some(path)) => match ControllerConfig::load_validated(path) {
                Ok(config) => (config, true),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Property file unusable, continuing with zeroed limits"
                    );
                    (ControllerConfig::default(), false)
                }
            },
            (None, None) => (ControllerConfig::default(), false),
        };

        let calibration = match (self.calibration, &config.calibration_file) {
            (Some(table), _) => table,
            (None, Some(path)) => CalibrationTable::from_file(path)?,
            (None, None) => CalibrationTable::reference(),
        };

        let limits = config.limits_for(calibration.len());
        let cycle_time = config.cycle_time();
        let set = build_axes(
            &AxisSetConfig {
                calibration: &calibration,
                limits: &limits,
                cycle_time,
                simulation: config.simulation,
                layout: &config.io,
            },
            self.io,
        )?;

        let plant = match set.variant {
            AxisVariant::Simulated => Some(plant_from_config(&config.dynamics, calibration.len())?),
            AxisVariant::Hardware => None,
        };

        let slots = set
            .axes
            .into_iter()
            .zip(&limits)
            .map(|(mut axis, limits)| {
                let position = axis.sensor(SensorKind::Position).unwrap_or(limits.initial_position);
                AxisSlot {
                    ports: AxisPorts::at(position),
                    drive_offset: ValuePort::new(limits.drive_offset),
                    limits: *limits,
                    torque_controlled: axis.torque_controlled(),
                    axis: Mutex::new(axis),
                }
            })
            .collect::<Vec<_>>();

        info!(
            controller = %self.name,
            axes = slots.len(),
            variant = %set.variant,
            cycle_us = config.cycle_time_us,
            "Controller ready"
        );

        Ok(ManipulatorController {
            name: self.name,
            config_path: self.config_path,
            layout: config.io.clone(),
            config,
            config_loaded,
            calibration,
            slots,
            variant: set.variant,
            io: set.io,
            plant,
            cycle: Mutex::new(CycleState::default()),
            activated: AtomicBool::new(false),
            events: EventBus::new(),
            cycle_time,
            shut_down: AtomicBool::new(false),
        })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
