//! HAL command and status types.
//!
//! - `HalCommands` - setpoints from the control loop to the driver
//! - `HalStatus` - one sample of panel inputs and motor telemetry

use crate::ride::input::InputFlags;
use crate::ride::motor::{ControllerStatus, DockPosition, DockState};

/// Setpoints written to the driver at the end of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HalCommands {
    /// Drive output energized.
    pub drive_enabled: bool,
    /// Speed setpoint [QPPS].
    pub speed: i32,
    /// Acceleration limit for reaching `speed` [QPPS/s].
    pub accel: u32,
    /// Servo outputs energized.
    pub servos_enabled: bool,
    /// Dock servo target. `None` leaves the servo where it is.
    pub dock_target: Option<DockPosition>,
}

impl HalCommands {
    /// Everything off.
    pub const fn safe() -> Self {
        Self {
            drive_enabled: false,
            speed: 0,
            accel: 0,
            servos_enabled: false,
            dock_target: None,
        }
    }
}

/// One driver sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalStatus {
    /// Physical panel inputs.
    pub panel: InputFlags,
    /// Raw encoder count [ticks].
    pub encoder_position: i64,
    /// Encoder signal present.
    pub encoder_ok: bool,
    /// Measured speed [QPPS].
    pub speed: i32,
    /// Motor current [A].
    pub current: f64,
    /// Main supply voltage [V].
    pub supply_voltage: f64,
    /// Controller health word.
    pub controller: ControllerStatus,
    /// Loading dock state.
    pub dock: DockState,
}

impl Default for HalStatus {
    fn default() -> Self {
        Self {
            panel: InputFlags::empty(),
            encoder_position: 0,
            encoder_ok: true,
            speed: 0,
            current: 0.0,
            supply_voltage: 0.0,
            controller: ControllerStatus::empty(),
            dock: DockState::Unknown,
        }
    }
}
