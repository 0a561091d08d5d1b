//! Operator-facing error taxonomy.
//!
//! `PreconditionError` is returned synchronously to whoever submitted a
//! command and never alters ride state. Conditions that threaten safety are
//! not errors at this level; they become faults.

use thiserror::Error;

use crate::ride::command::Command;
use crate::ride::fault::FaultCode;
use crate::ride::motor::DockState;
use crate::ride::state::{ControlAuthority, RideState};

/// Endpoint name that does not map to any command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command endpoint '{0}'")]
pub struct UnknownCommand(pub String);

/// A command was rejected by state or authority gating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// Command not accepted in the current ride state.
    #[error("{command} not accepted in state {state}")]
    InvalidState {
        /// Rejected command.
        command: Command,
        /// State at rejection.
        state: RideState,
    },

    /// Command requires WEB authority.
    #[error("{command} requires WEB control authority (current: {authority})")]
    AuthorityRequired {
        /// Rejected command.
        command: Command,
        /// Authority at rejection.
        authority: ControlAuthority,
    },

    /// An active fault blocks the command.
    #[error("{command} blocked by active fault {code}")]
    FaultActive {
        /// Rejected command.
        command: Command,
        /// First blocking fault.
        code: FaultCode,
    },

    /// Ride subsystem is powered down.
    #[error("{command} not accepted while ride is powered off")]
    RideOff {
        /// Rejected command.
        command: Command,
    },

    /// Encoder home cannot be reset while the ride is running.
    #[error("encoder home cannot be reset while RUNNING")]
    NotIdle,

    /// Actuator outputs are disabled.
    #[error("{command} not accepted while actuator outputs are disabled")]
    OutputsDisabled {
        /// Rejected command.
        command: Command,
    },

    /// Loading dock not at the dispatch position.
    #[error("{command} requires the loading dock at its dispatch position (dock: {dock:?})")]
    DockNotReady {
        /// Rejected command.
        command: Command,
        /// Dock state at rejection.
        dock: DockState,
    },
}

/// A motor telemetry sample could not be taken in time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("motor telemetry stale for {stale_cycles} cycle(s): {reason}")]
pub struct StaleTelemetryError {
    /// Consecutive cycles without a fresh sample.
    pub stale_cycles: u32,
    /// Driver-reported cause.
    pub reason: String,
}
