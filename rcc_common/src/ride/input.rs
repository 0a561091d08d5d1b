//! Discrete operator inputs.
//!
//! Raw readings from each source are kept as [`InputFlags`] banks; the input
//! registry merges them into [`EffectiveInputs`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// One bit per discrete input, used for raw per-source banks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct InputFlags: u8 {
        /// Emergency stop.
        const ESTOP    = 0x01;
        /// Controlled stop.
        const STOP     = 0x02;
        /// Dispatch the ride.
        const DISPATCH = 0x04;
        /// Ride subsystem power-off.
        const RIDE_OFF = 0x08;
        /// Recovery request.
        const RESTART  = 0x10;
    }
}

impl InputFlags {
    /// Inputs whose WEB source is never masked by control authority.
    pub const SAFETY: Self = Self::ESTOP.union(Self::STOP);
}

/// Logical input name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputName {
    /// Emergency stop.
    Estop,
    /// Controlled stop.
    Stop,
    /// Dispatch.
    Dispatch,
    /// Ride power-off.
    RideOff,
    /// Recovery request.
    Restart,
}

impl InputName {
    /// All inputs in panel order.
    pub const ALL: [Self; 5] = [
        Self::Estop,
        Self::Stop,
        Self::Dispatch,
        Self::RideOff,
        Self::Restart,
    ];

    /// Bank bit for this input.
    #[inline]
    pub const fn flag(self) -> InputFlags {
        match self {
            Self::Estop => InputFlags::ESTOP,
            Self::Stop => InputFlags::STOP,
            Self::Dispatch => InputFlags::DISPATCH,
            Self::RideOff => InputFlags::RIDE_OFF,
            Self::Restart => InputFlags::RESTART,
        }
    }

    /// Bank index, matching [`InputName::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Upper-case wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Estop => "ESTOP",
            Self::Stop => "STOP",
            Self::Dispatch => "DISPATCH",
            Self::RideOff => "RIDE_OFF",
            Self::Restart => "RESTART",
        }
    }
}

impl fmt::Display for InputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputSource {
    /// Hard-wired operator panel.
    Physical,
    /// Virtual input set through the gateway.
    Web,
}

/// One raw reading, as listed in status snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteInput {
    /// Which input.
    pub name: InputName,
    /// Which source.
    pub source: InputSource,
    /// Current level.
    pub asserted: bool,
    /// Cycle of the last level change.
    pub timestamp: u64,
}

/// Post-arbitration input view consumed by the state machine and fault monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectiveInputs {
    /// Effective ESTOP.
    pub estop: bool,
    /// Effective STOP.
    pub stop: bool,
    /// Effective DISPATCH.
    pub dispatch: bool,
    /// Effective RIDE_OFF.
    pub ride_off: bool,
    /// Effective RESTART.
    pub restart: bool,
}

impl EffectiveInputs {
    /// Build from a merged flag bank.
    pub const fn from_flags(flags: InputFlags) -> Self {
        Self {
            estop: flags.contains(InputFlags::ESTOP),
            stop: flags.contains(InputFlags::STOP),
            dispatch: flags.contains(InputFlags::DISPATCH),
            ride_off: flags.contains(InputFlags::RIDE_OFF),
            restart: flags.contains(InputFlags::RESTART),
        }
    }

    /// Collapse back into a flag bank.
    pub fn to_flags(self) -> InputFlags {
        let mut flags = InputFlags::empty();
        flags.set(InputFlags::ESTOP, self.estop);
        flags.set(InputFlags::STOP, self.stop);
        flags.set(InputFlags::DISPATCH, self.dispatch);
        flags.set(InputFlags::RIDE_OFF, self.ride_off);
        flags.set(InputFlags::RESTART, self.restart);
        flags
    }
}
