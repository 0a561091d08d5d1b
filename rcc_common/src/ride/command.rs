//! Operator commands and state-machine motor commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ride::error::UnknownCommand;
use crate::ride::motor::{DockPosition, JogDirection};

/// Command submitted through the gateway. Always WEB-sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Latch the web ESTOP.
    Estop,
    /// Release the web ESTOP latch.
    EstopRelease,
    /// One-cycle web STOP.
    Stop,
    /// One-cycle web DISPATCH.
    Dispatch,
    /// Toggle the web RIDE_OFF latch.
    RideOff,
    /// One-cycle web RESTART.
    Restart,
    /// Flip control authority.
    ToggleWebControls,
    /// Keep the web link alive.
    Heartbeat,
    /// Enter MAINTENANCE.
    MaintenanceEnter,
    /// Leave MAINTENANCE.
    MaintenanceExit,
    /// One jog tick.
    Jog(JogDirection),
    /// Take the current encoder count as home.
    ResetEncoder,
    /// Move the loading dock.
    SetDock(DockPosition),
    /// De-energize actuator outputs.
    DisableServos,
    /// Re-arm actuator outputs.
    EnableServos,
    /// Drive back to the home reference.
    GoHome,
}

impl Command {
    /// Endpoint name as used by the HMI.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Estop => "estop",
            Self::EstopRelease => "estop_release",
            Self::Stop => "stop",
            Self::Dispatch => "dispatch",
            Self::RideOff => "ride_off",
            Self::Restart => "restart",
            Self::ToggleWebControls => "toggle_webcontrols",
            Self::Heartbeat => "heartbeat",
            Self::MaintenanceEnter => "maintenance_enter",
            Self::MaintenanceExit => "maintenance_exit",
            Self::Jog(JogDirection::Forward) => "motor/creep_fwd",
            Self::Jog(JogDirection::Backward) => "motor/creep_bwd",
            Self::ResetEncoder => "motor/reset_encoder",
            Self::SetDock(DockPosition::Raised) => "motor/raise_loading",
            Self::SetDock(DockPosition::Lowered) => "motor/drop_loading",
            Self::DisableServos => "motor/disable_servos",
            Self::EnableServos => "motor/enable_servos",
            Self::GoHome => "motor/go_home",
        }
    }

    /// Commands that are honored regardless of control authority.
    pub const fn is_safety(self) -> bool {
        matches!(
            self,
            Self::Estop | Self::EstopRelease | Self::Stop | Self::DisableServos
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/');
        let cmd = match name {
            "estop" => Self::Estop,
            "estop_release" => Self::EstopRelease,
            "stop" => Self::Stop,
            "dispatch" => Self::Dispatch,
            "ride_off" => Self::RideOff,
            "restart" => Self::Restart,
            "toggle_webcontrols" => Self::ToggleWebControls,
            "heartbeat" => Self::Heartbeat,
            "maintenance_enter" => Self::MaintenanceEnter,
            "maintenance_exit" => Self::MaintenanceExit,
            "motor/creep_fwd" => Self::Jog(JogDirection::Forward),
            "motor/creep_bwd" => Self::Jog(JogDirection::Backward),
            "motor/reset_encoder" => Self::ResetEncoder,
            "motor/raise_loading" => Self::SetDock(DockPosition::Raised),
            "motor/drop_loading" => Self::SetDock(DockPosition::Lowered),
            "motor/disable_servos" => Self::DisableServos,
            "motor/enable_servos" => Self::EnableServos,
            "motor/go_home" => Self::GoHome,
            _ => return Err(UnknownCommand(name.to_string())),
        };
        Ok(cmd)
    }
}

/// Motor command issued by the ride state machine, one per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorCommand {
    /// Cut drive outputs immediately.
    SafeStop,
    /// Decelerate at the stop rate, then de-energize.
    ControlledStop,
    /// Outputs off, no motion expected.
    #[default]
    Disable,
    /// Energized at zero speed.
    Hold,
    /// Pursue operator jog/homing targets; hold otherwise.
    Manual,
    /// Run (or continue) the ride program.
    RunProgram,
}
