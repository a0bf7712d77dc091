//! # Axion Controller
//!
//! Runs one controller instance in a fixed-period cycle.
//!
//! The controller type is looked up in the component registry and built
//! from a TOML property file. With `--loopback-io` a hardware configuration
//! runs against the in-memory I/O backend instead of boards.
//!
//! Commands are read from stdin, one per line:
//!
//! ```text
//! prepareForUse
//! unlockAxis 0
//! startAxis 0
//! drive 0 0.5
//! addDriveOffset 1 0.05
//! quit
//! ```

use axion_common::consts::DEFAULT_CONFIG_PATH;
use axion_common::prelude::*;
use axion_controller::registry::MANIPULATOR_CONTROLLER;
use axion_controller::{Component, ComponentRegistry, CycleRunner, ManipulatorController, RtSettings};
use axion_hal::LoopbackIo;
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Delay between relay switch-on and interlock confirmation on the loopback
/// backend.
const LOOPBACK_INTERLOCK_DELAY: Duration = Duration::from_millis(50);

/// How long `--auto-enable` waits for the interlock.
const INTERLOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Axion Controller - supervisory manipulator control loop
#[derive(Parser, Debug)]
#[command(name = "axion_controller")]
#[command(version)]
#[command(about = "Supervisory controller for multi-axis manipulators")]
struct Args {
    /// Controller property file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Registered component type to instantiate.
    #[arg(long = "type", default_value = MANIPULATOR_CONTROLLER)]
    component_type: String,

    /// Instance name.
    #[arg(long, default_value = "manipulator")]
    name: String,

    /// Run hardware axes against the in-memory loopback backend.
    #[arg(long)]
    loopback_io: bool,

    /// Prepare for use, unlock and start every axis before the loop.
    #[arg(long)]
    auto_enable: bool,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// CPU core to pin the cycle thread to.
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let log_level = ControllerConfig::load_or_default(&args.config).log_level;
    setup_tracing(&args, log_level);

    info!("Axion Controller v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Axion Controller shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let component = create_component(args)?;
    component.startup()?;

    if args.auto_enable {
        auto_enable(component.as_ref());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let _console = spawn_console(component.clone(), running.clone())?;

    RtSettings {
        cpu_core: args.cpu_core,
        priority: args.rt_priority,
    }
    .apply()?;
    let mut runner = CycleRunner::new(component.clone(), running).with_max_cycles(args.cycles);
    let result = runner.run();

    component.shutdown()?;
    result?;
    Ok(())
}

/// Build through the registry, or directly when a loopback backend is wanted.
fn create_component(args: &Args) -> Result<Arc<dyn Component>, Box<dyn std::error::Error>> {
    if !args.loopback_io {
        let registry = ComponentRegistry::with_builtin();
        return Ok(registry.create(&args.component_type, &args.name, &args.config)?);
    }
    if args.component_type != MANIPULATOR_CONTROLLER {
        return Err(format!("--loopback-io is only supported for {MANIPULATOR_CONTROLLER}").into());
    }

    let config = ControllerConfig::load_or_default(&args.config);
    if config.simulation {
        warn!("--loopback-io has no effect: the configuration selects simulated axes");
    }
    let calibration = match &config.calibration_file {
        Some(path) => CalibrationTable::from_file(path)?,
        None => CalibrationTable::reference(),
    };
    let io = Arc::new(LoopbackIo::for_arm(&config.io, &calibration, LOOPBACK_INTERLOCK_DELAY));
    let controller = ManipulatorController::builder(args.name.as_str())
        .config_file(&args.config)
        .calibration(calibration)
        .io(io)
        .build()?;
    Ok(Arc::new(controller))
}

/// Prepare for use, wait for the interlock, then unlock and start all axes.
fn auto_enable(component: &dyn Component) {
    if component.execute(Command::PrepareForUse).is_err() {
        return;
    }
    let deadline = Instant::now() + INTERLOCK_TIMEOUT;
    while !component.is_completed(Command::PrepareForUse) {
        if Instant::now() >= deadline {
            warn!("Interlock not confirmed, axes stay locked");
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    let enabled = component.execute(Command::UnlockAllAxes).is_ok()
        && component.execute(Command::StartAllAxes).is_ok();
    info!(enabled, "Auto-enable finished");
}

/// Read commands from stdin on a background thread.
fn spawn_console(
    component: Arc<dyn Component>,
    running: Arc<AtomicBool>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if !console_line(component.as_ref(), line.trim(), &running) {
                    break;
                }
            }
        })
}

/// Handle one console line. Returns false when the console should close.
fn console_line(component: &dyn Component, line: &str, running: &AtomicBool) -> bool {
    let mut words = line.split_whitespace();
    match words.next() {
        None => true,
        Some("quit" | "exit") => {
            running.store(false, Ordering::SeqCst);
            false
        }
        Some("drive") => {
            let axis = words.next().and_then(|w| w.parse::<usize>().ok());
            let value = words.next().and_then(|w| w.parse::<f64>().ok());
            match (axis, value, axis.and_then(|a| component.ports(a))) {
                (Some(axis), Some(value), Some(ports)) if value.is_finite() => {
                    ports.drive.set(value);
                    info!(axis, value, "Drive input set");
                }
                _ => warn!(line, "Usage: drive <axis> <value>"),
            }
            true
        }
        Some(_) => {
            match line.parse::<Command>() {
                Ok(command) => match component.execute(command) {
                    Ok(()) => info!(%command, "Command issued"),
                    Err(e) => warn!(%command, error = %e, "Command rejected"),
                },
                Err(e) => warn!(line, error = %e, "Unknown console input"),
            }
            true
        }
    }
}

fn setup_tracing(args: &Args, log_level: LogLevel) {
    let directive: Directive = if args.verbose {
        Level::DEBUG.into()
    } else {
        log_level
            .as_directive()
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(directive);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
