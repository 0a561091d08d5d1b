//! Ride I/O driver trait and error types.

use crate::hal::types::{HalCommands, HalStatus};
use std::time::Duration;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// Driver initialization failed.
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// A device read or write did not complete within its time bound.
    #[error("Device timeout: {0}")]
    Timeout(String),

    /// Hardware communication error.
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Driver not found.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// State persistence error.
    #[error("State persistence error: {0}")]
    PersistenceError(String),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn RideIo>;

/// Interface for ride I/O backends (simulation, motor controller over serial, ...).
///
/// # Lifecycle
///
/// 1. `init()` - once, before the control loop starts
/// 2. `sample()` then `write()` - every cycle, from the control loop thread
/// 3. `shutdown()` - once, after the loop exits
///
/// # Timing Contracts
///
/// | Operation | Max Duration | Constraint |
/// |-----------|--------------|------------|
/// | `init()` | 30 seconds | pre-loop |
/// | `sample()` | fraction of cycle_time_us | **HARD**: return `Timeout` instead of blocking |
/// | `write()` | fraction of cycle_time_us | **HARD** |
/// | `shutdown()` | 1 second | post-loop |
pub trait RideIo: Send {
    /// Driver identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// Driver semantic version.
    fn version(&self) -> &'static str;

    /// Open devices and bring outputs to a safe state.
    fn init(&mut self) -> Result<(), HalError>;

    /// Read panel inputs and motor telemetry.
    ///
    /// `dt` is the time since the previous sample.
    fn sample(&mut self, dt: Duration) -> Result<HalStatus, HalError>;

    /// Apply setpoints.
    fn write(&mut self, commands: &HalCommands) -> Result<(), HalError>;

    /// Force all outputs off. Used when a cycle fails part-way.
    fn force_safe(&mut self) -> Result<(), HalError> {
        self.write(&HalCommands::safe())
    }

    /// Release devices. Outputs must be left de-energized.
    fn shutdown(&mut self) -> Result<(), HalError>;
}
