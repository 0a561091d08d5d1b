//! Ride state and control authority enums.
//!
//! Both enums use `#[repr(u8)]` so they can travel as a single byte in
//! snapshots and persisted diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supervisory ride state.
///
/// Exactly one value is current at any instant. Only the ride state machine
/// writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RideState {
    /// Power-on or post-restart self-test.
    #[default]
    Init = 0,
    /// Ready, no motion.
    Idle = 1,
    /// Dispatch latched, pre-motion checks running.
    DispatchPending = 2,
    /// Ride program in motion.
    Running = 3,
    /// Controlled deceleration after STOP.
    Stopping = 4,
    /// Halted and de-energized, recoverable.
    Stopped = 5,
    /// A CRITICAL fault is active. Self-heals once faults clear.
    Fault = 6,
    /// Emergency stop. Left only through RESTART.
    Estop = 7,
    /// Manual jog/servo operation outside the automatic sequence.
    Maintenance = 8,
}

impl RideState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Init),
            1 => Some(Self::Idle),
            2 => Some(Self::DispatchPending),
            3 => Some(Self::Running),
            4 => Some(Self::Stopping),
            5 => Some(Self::Stopped),
            6 => Some(Self::Fault),
            7 => Some(Self::Estop),
            8 => Some(Self::Maintenance),
            _ => None,
        }
    }

    /// Upper-case wire name, as shown on the HMI.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Idle => "IDLE",
            Self::DispatchPending => "DISPATCH_PENDING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Fault => "FAULT",
            Self::Estop => "ESTOP",
            Self::Maintenance => "MAINTENANCE",
        }
    }

    /// States in which the drive may be commanded to move by the ride program.
    #[inline]
    pub const fn is_ride_motion(self) -> bool {
        matches!(self, Self::DispatchPending | Self::Running)
    }

    /// States that accept manual jog and homing.
    #[inline]
    pub const fn accepts_manual_motion(self) -> bool {
        matches!(self, Self::Idle | Self::Maintenance)
    }
}

impl fmt::Display for RideState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which command source may issue non-safety commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ControlAuthority {
    /// Physical operator panel.
    #[default]
    Physical = 0,
    /// Web HMI.
    Web = 1,
}

impl ControlAuthority {
    /// The other mode.
    #[inline]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Physical => Self::Web,
            Self::Web => Self::Physical,
        }
    }

    /// Upper-case wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "PHYSICAL",
            Self::Web => "WEB",
        }
    }
}

impl fmt::Display for ControlAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
