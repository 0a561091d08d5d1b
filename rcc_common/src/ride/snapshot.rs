//! Immutable per-cycle snapshot published to gateway readers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::LogLevel;
use crate::consts::LOG_MESSAGE_LEN;
use crate::ride::command::MotorCommand;
use crate::ride::fault::{FaultSeverity, FaultView};
use crate::ride::input::{DiscreteInput, EffectiveInputs};
use crate::ride::motor::MotorStatus;
use crate::ride::state::{ControlAuthority, RideState};

/// Everything a status reader can see, committed at the end of one cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RideSnapshot {
    /// Cycle number that produced this snapshot.
    pub cycle: u64,
    /// Ride state.
    pub state: RideState,
    /// Ride subsystem powered.
    pub powered: bool,
    /// Control authority.
    pub authority: ControlAuthority,
    /// Effective inputs used this cycle.
    pub inputs: EffectiveInputs,
    /// Raw readings per source.
    pub readings: Vec<DiscreteInput>,
    /// Active faults keyed by numeric code.
    pub faults: BTreeMap<u16, FaultView>,
    /// Motor telemetry.
    pub motor: MotorStatus,
    /// Motor command issued this cycle.
    pub motor_command: MotorCommand,
}

impl RideSnapshot {
    /// Ride state, inputs and authority.
    pub fn status(&self) -> RideStatus {
        RideStatus {
            cycle: self.cycle,
            state: self.state,
            powered: self.powered,
            authority: self.authority,
            inputs: self.inputs,
            readings: self.readings.clone(),
        }
    }

    /// Whether any active fault is at least `severity`.
    pub fn has_fault_at_least(&self, severity: FaultSeverity) -> bool {
        self.faults.values().any(|f| f.severity >= severity)
    }

    /// Lowest active fault code, if any.
    pub fn first_fault_code(&self) -> Option<u16> {
        self.faults.keys().next().copied()
    }
}

/// Ride status endpoint payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideStatus {
    /// Cycle number.
    pub cycle: u64,
    /// Ride state.
    pub state: RideState,
    /// Ride subsystem powered.
    pub powered: bool,
    /// Control authority.
    pub authority: ControlAuthority,
    /// Effective inputs.
    pub inputs: EffectiveInputs,
    /// Raw readings per source.
    pub readings: Vec<DiscreteInput>,
}

/// One line of the operator log tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Cycle the entry was recorded.
    pub cycle: u64,
    /// Level.
    pub level: LogLevel,
    /// Text, truncated to a fixed capacity.
    pub message: heapless::String<LOG_MESSAGE_LEN>,
}

impl LogEntry {
    /// Build an entry, truncating `text` on a character boundary.
    pub fn new(cycle: u64, level: LogLevel, text: &str) -> Self {
        let mut message = heapless::String::new();
        for ch in text.chars() {
            if message.push(ch).is_err() {
                break;
            }
        }
        Self {
            cycle,
            level,
            message,
        }
    }
}
