//! Component registry.
//!
//! Maps a type name to a factory taking an instance name and a property file
//! path. The binary looks its controller up here, so new controller types
//! only need a `register` call.

use crate::controller::ManipulatorController;
use crate::cycle::CycleReport;
use crate::error::{CommandError, ControllerError};
use crate::ports::AxisPorts;
use crate::safety::EventBus;
use axion_common::control_unit::command::Command;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Type name the manipulator controller registers under.
pub const MANIPULATOR_CONTROLLER: &str = "ManipulatorController";

/// A cyclic component as the runner and the console see it.
pub trait Component: Send + Sync {
    /// Instance name.
    fn name(&self) -> &str;

    /// Period at which [`update`](Component::update) is expected.
    fn cycle_time(&self) -> Duration;

    /// Called once before the first cycle.
    fn startup(&self) -> Result<(), ControllerError> {
        Ok(())
    }

    /// One cycle.
    fn update(&self) -> CycleReport;

    /// Called once after the last cycle.
    fn shutdown(&self) -> Result<(), ControllerError>;

    /// Issue a command.
    fn execute(&self, command: Command) -> Result<(), CommandError>;

    /// Completion predicate of a command.
    fn is_completed(&self, command: Command) -> bool;

    /// Number of axes.
    fn axis_count(&self) -> usize;

    /// Ports of one axis.
    fn ports(&self, axis: usize) -> Option<&AxisPorts>;

    /// Notification bus.
    fn events(&self) -> &EventBus;
}

impl Component for ManipulatorController {
    fn name(&self) -> &str {
        ManipulatorController::name(self)
    }

    fn cycle_time(&self) -> Duration {
        ManipulatorController::cycle_time(self)
    }

    fn startup(&self) -> Result<(), ControllerError> {
        info!(
            controller = %self.name(),
            axes = self.axis_count(),
            variant = %self.variant(),
            "Controller started"
        );
        Ok(())
    }

    fn update(&self) -> CycleReport {
        ManipulatorController::update(self)
    }

    fn shutdown(&self) -> Result<(), ControllerError> {
        Ok(ManipulatorController::shutdown(self)?)
    }

    fn execute(&self, command: Command) -> Result<(), CommandError> {
        ManipulatorController::execute(self, command)
    }

    fn is_completed(&self, command: Command) -> bool {
        ManipulatorController::is_completed(self, command)
    }

    fn axis_count(&self) -> usize {
        ManipulatorController::axis_count(self)
    }

    fn ports(&self, axis: usize) -> Option<&AxisPorts> {
        ManipulatorController::ports(self, axis)
    }

    fn events(&self) -> &EventBus {
        ManipulatorController::events(self)
    }
}

/// Constructor registered for a type name.
pub type ComponentFactory = fn(&str, &Path) -> Result<Arc<dyn Component>, ControllerError>;

fn create_manipulator(name: &str, config: &Path) -> Result<Arc<dyn Component>, ControllerError> {
    Ok(Arc::new(ManipulatorController::from_config_file(name, config)?))
}

/// Registry of component factories.
pub struct ComponentRegistry {
    factories: HashMap<&'static str, ComponentFactory>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every component type of this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(MANIPULATOR_CONTROLLER, create_manipulator);
        registry
    }

    /// Register a factory.
    ///
    /// # Panics
    /// Panics if a factory with the same type name is already registered.
    pub fn register(&mut self, type_name: &'static str, factory: ComponentFactory) {
        if self.factories.contains_key(type_name) {
            panic!("Component type '{type_name}' is already registered");
        }
        self.factories.insert(type_name, factory);
    }

    /// Create an instance called `name` configured from `config`.
    ///
    /// # Errors
    /// `ControllerError::UnknownType` if nothing is registered under
    /// `type_name`; otherwise whatever the factory returns.
    pub fn create(
        &self,
        type_name: &str,
        name: &str,
        config: &Path,
    ) -> Result<Arc<dyn Component>, ControllerError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| ControllerError::UnknownType(type_name.to_string()))?;
        factory(name, config)
    }

    /// Registered type names.
    pub fn list(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
