//! # Axion Controller Library
//!
//! Supervisory controller for a multi-axis manipulator. Converts raw sensor
//! values into physical units, enforces per-axis safety envelopes, advances
//! each axis through its Locked/Stopped/Driven lifecycle and drives either
//! hardware or a simulated plant inside a fixed-rate cycle.
//!
//! ## Module Structure
//!
//! - [`controller`] - `ManipulatorController`, its builder and teardown
//! - [`dispatch`] - Command issue and completion predicates
//! - [`cycle`] - The periodic `update` and its `CycleReport`
//! - [`safety`] - Envelope checks and the notification bus
//! - [`ports`] - Lock-free published values and drive inputs
//! - [`registry`] - `Component` trait and factory registry
//! - [`runner`] - RT scheduling and the fixed-period loop
//!
//! ## Concurrency
//!
//! Every controller method takes `&self`. Commands may be issued from any
//! thread while another runs the cycle: each axis sits behind its own lock,
//! held for one transition or one per-axis cycle step, so a stop never
//! interleaves with a drive on the same axis.
//!
//! ```rust
//! use axion_controller::ManipulatorController;
//!
//! let arm = ManipulatorController::builder("arm").build().unwrap();
//! assert!(arm.prepare_for_use() && arm.prepare_for_use_completed());
//! assert!(arm.unlock_axis(0) && arm.start_axis(0));
//! arm.ports(0).unwrap().drive.set(0.5);
//! assert_eq!(arm.update().driven, 1);
//! ```

pub mod controller;
pub mod cycle;
pub mod dispatch;
pub mod error;
pub mod ports;
pub mod registry;
pub mod runner;
pub mod safety;

pub use controller::{ControllerBuilder, ManipulatorController};
pub use cycle::CycleReport;
pub use error::{CommandError, ControllerError, CycleError};
pub use ports::{AxisPorts, ValuePort};
pub use registry::{Component, ComponentRegistry};
pub use runner::{CycleRunner, CycleStats, OverrunPolicy, RtSettings};
pub use safety::EventBus;
