//! In-memory I/O backend.
//!
//! `LoopbackIo` stores every channel in memory:
//! - Encoders and analog inputs are set by the test or the console
//! - Analog and digital outputs are recorded and can be read back
//! - Linked reactions: a digital output edge schedules a delayed digital
//!   input change, which is how the safety interlock confirmation is modelled

use axion_common::hal::calibration::CalibrationTable;
use axion_common::hal::error::HalError;
use axion_common::hal::io::IoBackend;
use axion_common::control_unit::config::IoLayout;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Channel counts of a loopback backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelCounts {
    /// Absolute encoders.
    pub encoders: usize,
    /// Analog inputs.
    pub analog_inputs: usize,
    /// Analog outputs.
    pub analog_outputs: usize,
    /// Digital inputs.
    pub digital_inputs: usize,
    /// Digital outputs.
    pub digital_outputs: usize,
}

/// DO edge → delayed DI change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitalLink {
    /// Digital output watched for edges.
    pub output: usize,
    /// Edge that fires the link (`true` = rising).
    pub trigger: bool,
    /// Digital input changed by the link.
    pub input: usize,
    /// Value written to the input.
    pub result: bool,
    /// Delay between the edge and the input change.
    pub delay: Duration,
}

/// Pending DI change queued by a linked reaction.
#[derive(Debug, Clone, Copy)]
struct PendingDiChange {
    trigger_time: Instant,
    input: usize,
    state: bool,
}

#[derive(Debug, Default)]
struct LoopbackState {
    encoders: Vec<i64>,
    analog_inputs: Vec<f64>,
    analog_outputs: Vec<f64>,
    digital_inputs: Vec<bool>,
    digital_outputs: Vec<bool>,
    links: Vec<DigitalLink>,
    pending: VecDeque<PendingDiChange>,
}

impl LoopbackState {
    /// Apply pending DI changes whose time has arrived.
    fn process_pending(&mut self, now: Instant) {
        while let Some(change) = self.pending.front().copied() {
            if change.trigger_time > now {
                break;
            }
            self.pending.pop_front();
            if let Some(slot) = self.digital_inputs.get_mut(change.input) {
                if *slot != change.state {
                    debug!(
                        "DI[{}] changed: {} -> {}",
                        change.input,
                        on_off(*slot),
                        on_off(change.state)
                    );
                }
                *slot = change.state;
            }
        }
    }

    fn handle_do_edge(&mut self, output: usize, state: bool, now: Instant) {
        for link in self
            .links
            .iter()
            .filter(|l| l.output == output && l.trigger == state)
        {
            trace!(
                "DO[{}] {} -> queued DI[{}] = {} in {:?}",
                output,
                on_off(state),
                link.input,
                on_off(link.result),
                link.delay
            );
            let change = PendingDiChange {
                trigger_time: now + link.delay,
                input: link.input,
                state: link.result,
            };
            // keep the queue time-ordered
            let at = self
                .pending
                .iter()
                .position(|p| p.trigger_time > change.trigger_time)
                .unwrap_or(self.pending.len());
            self.pending.insert(at, change);
        }
    }
}

fn on_off(state: bool) -> &'static str {
    if state { "ON" } else { "OFF" }
}

fn channel<'a, T>(slots: &'a [T], kind: &'static str, channel: usize) -> Result<&'a T, HalError> {
    slots
        .get(channel)
        .ok_or(HalError::NoSuchChannel { kind, channel })
}

fn channel_mut<'a, T>(
    slots: &'a mut [T],
    kind: &'static str,
    channel: usize,
) -> Result<&'a mut T, HalError> {
    slots
        .get_mut(channel)
        .ok_or(HalError::NoSuchChannel { kind, channel })
}

/// In-memory I/O backend.
#[derive(Debug, Default)]
pub struct LoopbackIo {
    state: Mutex<LoopbackState>,
}

impl LoopbackIo {
    /// Backend with the given channel counts, all zero/off.
    pub fn new(counts: ChannelCounts) -> Self {
        debug!(
            "LoopbackIo initialized: {} ENC, {} AI, {} AO, {} DI, {} DO",
            counts.encoders,
            counts.analog_inputs,
            counts.analog_outputs,
            counts.digital_inputs,
            counts.digital_outputs
        );
        Self {
            state: Mutex::new(LoopbackState {
                encoders: vec![0; counts.encoders],
                analog_inputs: vec![0.0; counts.analog_inputs],
                analog_outputs: vec![0.0; counts.analog_outputs],
                digital_inputs: vec![false; counts.digital_inputs],
                digital_outputs: vec![false; counts.digital_outputs],
                ..Default::default()
            }),
        }
    }

    /// Backend wired for an arm with `layout`.
    ///
    /// Every encoder starts at its calibrated zero, and each interlock relay
    /// output confirms on its input after `interlock_delay`.
    pub fn for_arm(layout: &IoLayout, calibration: &CalibrationTable, interlock_delay: Duration) -> Self {
        let axes = calibration.len();
        let end = |base: usize| base.saturating_add(axes);
        let counts = ChannelCounts {
            encoders: end(layout.encoder_base),
            analog_inputs: end(layout.tacho_input_base).max(end(layout.current_input_base)),
            analog_outputs: end(layout.drive_output_base),
            digital_inputs: layout.interlock_inputs.iter().max().map_or(0, |m| m + 1),
            digital_outputs: [
                end(layout.enable_output_base),
                end(layout.brake_output_base),
                end(layout.mode_output_base),
                layout.interlock_outputs[0] + 1,
                layout.interlock_outputs[1] + 1,
            ]
            .into_iter()
            .max()
            .unwrap_or(0),
        };

        let io = Self::new(counts);
        {
            let mut state = io.state.lock();
            for (axis, entry) in calibration.iter().enumerate() {
                state.encoders[layout.encoder(axis)] = entry.encoder_offset;
            }
        }
        for (output, input) in layout.interlock_outputs.into_iter().zip(layout.interlock_inputs) {
            for edge in [true, false] {
                io.link(DigitalLink {
                    output,
                    trigger: edge,
                    input,
                    result: edge,
                    delay: interlock_delay,
                });
            }
        }
        io
    }

    /// Add a linked reaction.
    pub fn link(&self, link: DigitalLink) {
        self.state.lock().links.push(link);
    }

    /// Set a raw encoder count.
    pub fn set_encoder(&self, ch: usize, ticks: i64) -> Result<(), HalError> {
        *channel_mut(&mut self.state.lock().encoders, "encoder", ch)? = ticks;
        Ok(())
    }

    /// Set an analog input voltage.
    pub fn set_analog_input(&self, ch: usize, volts: f64) -> Result<(), HalError> {
        *channel_mut(&mut self.state.lock().analog_inputs, "analog input", ch)? = volts;
        Ok(())
    }

    /// Force a digital input.
    pub fn set_digital_input(&self, ch: usize, on: bool) -> Result<(), HalError> {
        *channel_mut(&mut self.state.lock().digital_inputs, "digital input", ch)? = on;
        Ok(())
    }

    /// Last voltage written to an analog output.
    pub fn analog_output(&self, ch: usize) -> Result<f64, HalError> {
        channel(&self.state.lock().analog_outputs, "analog output", ch).copied()
    }

    /// Last state written to a digital output.
    pub fn digital_output(&self, ch: usize) -> Result<bool, HalError> {
        channel(&self.state.lock().digital_outputs, "digital output", ch).copied()
    }
}

impl IoBackend for LoopbackIo {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn read_encoder(&self, ch: usize) -> Result<i64, HalError> {
        channel(&self.state.lock().encoders, "encoder", ch).copied()
    }

    fn read_analog(&self, ch: usize) -> Result<f64, HalError> {
        channel(&self.state.lock().analog_inputs, "analog input", ch).copied()
    }

    fn write_analog(&self, ch: usize, volts: f64) -> Result<(), HalError> {
        *channel_mut(&mut self.state.lock().analog_outputs, "analog output", ch)? = volts;
        Ok(())
    }

    fn write_digital(&self, ch: usize, on: bool) -> Result<(), HalError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let slot = channel_mut(&mut state.digital_outputs, "digital output", ch)?;
        let previous = std::mem::replace(slot, on);
        if previous != on {
            state.handle_do_edge(ch, on, now);
        }
        Ok(())
    }

    fn read_digital(&self, ch: usize) -> Result<bool, HalError> {
        let mut state = self.state.lock();
        state.process_pending(Instant::now());
        channel(&state.digital_inputs, "digital input", ch).copied()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
