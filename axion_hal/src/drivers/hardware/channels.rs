use axion_common::control_unit::config::IoLayout;

/// Channel numbers used by one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisChannels {
    /// Absolute encoder.
    pub encoder: usize,
    /// Tachometer analog input.
    pub tacho: usize,
    /// Current shunt analog input.
    pub current: usize,
    /// Drive reference analog output.
    pub drive: usize,
    /// Drive enable digital output.
    pub enable: usize,
    /// Brake digital output (on = engaged).
    pub brake: usize,
    /// Torque-mode relay digital output.
    pub mode: usize,
}

impl AxisChannels {
    /// Channels of `axis` under `layout`.
    pub const fn resolve(layout: &IoLayout, axis: usize) -> Self {
        Self {
            encoder: layout.encoder(axis),
            tacho: layout.tacho_input(axis),
            current: layout.current_input(axis),
            drive: layout.drive_output(axis),
            enable: layout.enable_output(axis),
            brake: layout.brake_output(axis),
            mode: layout.mode_output(axis),
        }
    }
}
