//! Prelude module for common re-exports.
//!
//! ```rust
//! use rcc_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::ride::config::RccConfig;

// ─── Ride Domain ────────────────────────────────────────────────────
pub use crate::ride::command::{Command, MotorCommand};
pub use crate::ride::error::{PreconditionError, StaleTelemetryError};
pub use crate::ride::fault::{Fault, FaultCode, FaultSeverity, FaultView};
pub use crate::ride::input::{EffectiveInputs, InputFlags, InputName, InputSource};
pub use crate::ride::motor::{
    ControllerStatus, DockPosition, DockState, JogDirection, MotorActivity, MotorStatus,
};
pub use crate::ride::snapshot::{LogEntry, RideSnapshot, RideStatus};
pub use crate::ride::state::{ControlAuthority, RideState};

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::driver::{HalError, RideIo};
pub use crate::hal::types::{HalCommands, HalStatus};
