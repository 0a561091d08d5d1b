//! Simulation driver implementation.

use super::handle::SimHandle;
use super::physics::{MotorSimulator, ServoSimulator};
use rcc_common::hal::driver::{HalError, RideIo};
use rcc_common::hal::types::{HalCommands, HalStatus};
use rcc_common::ride::motor::DockPosition;
use std::time::Duration;
use tracing::{debug, info};

/// Simulation driver implementing `RideIo`.
pub struct SimulationDriver {
    name: &'static str,
    version: &'static str,
    initialized: bool,
    motor: MotorSimulator,
    servo: ServoSimulator,
    commands: HalCommands,
    handle: SimHandle,
}

impl SimulationDriver {
    /// Ride at encoder 0 with the dock lowered.
    pub fn new() -> Self {
        Self::with_state(0, DockPosition::Lowered)
    }

    /// Ride at a given encoder count and dock position.
    pub fn with_state(encoder_position: i64, dock: DockPosition) -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            initialized: false,
            motor: MotorSimulator::new(encoder_position),
            servo: ServoSimulator::new(dock),
            commands: HalCommands::safe(),
            handle: SimHandle::new(),
        }
    }

    /// Handle for panel presses and fault injection.
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RideIo for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self) -> Result<(), HalError> {
        self.commands = HalCommands::safe();
        self.initialized = true;
        info!(
            "Simulation driver initialized (encoder={}, dock={:?})",
            self.motor.position(),
            self.servo.state()
        );
        Ok(())
    }

    fn sample(&mut self, dt: Duration) -> Result<HalStatus, HalError> {
        if !self.initialized {
            return Err(HalError::InitFailed("sample before init".to_string()));
        }
        if self.handle.take_panic() {
            panic!("simulated driver panic");
        }
        let inj = self.handle.get();

        self.motor.set_stalled(inj.stalled);
        self.motor.command(
            self.commands.drive_enabled,
            self.commands.speed,
            self.commands.accel,
        );
        self.motor.step(dt);
        self.servo
            .step(dt, self.commands.servos_enabled, self.commands.dock_target);

        if inj.sample_timeout {
            return Err(HalError::Timeout("motor controller read".to_string()));
        }

        let current = self.motor.current() + inj.extra_current;
        Ok(HalStatus {
            panel: inj.panel,
            encoder_position: self.motor.position(),
            encoder_ok: !inj.encoder_lost,
            speed: self.motor.speed(),
            current,
            supply_voltage: inj
                .voltage_override
                .unwrap_or_else(|| self.motor.supply_voltage()),
            controller: inj.controller_bits,
            dock: self.servo.state(),
        })
    }

    fn write(&mut self, commands: &HalCommands) -> Result<(), HalError> {
        if self.handle.get().write_failure {
            return Err(HalError::CommunicationError(
                "motor controller write".to_string(),
            ));
        }
        self.commands = *commands;
        Ok(())
    }

    fn force_safe(&mut self) -> Result<(), HalError> {
        // Bypasses injected write failures: models the hardware enable line.
        self.commands = HalCommands::safe();
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        self.commands = HalCommands::safe();
        self.initialized = false;
        debug!("Simulation driver shut down");
        Ok(())
    }
}
