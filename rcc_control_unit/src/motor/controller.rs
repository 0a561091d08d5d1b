//! Motor/actuator controller.
//!
//! Owns the live [`MotorStatus`], the persisted encoder home and every drive
//! and servo target. Called from the control loop only:
//!
//! 1. [`MotorController::ingest`] with the cycle's driver sample
//! 2. operator operations (`jog`, `set_loading_dock`, ...) as commands drain
//! 3. [`MotorController::control`] with the state machine's [`MotorCommand`]

use rcc_common::hal::driver::HalError;
use rcc_common::hal::types::{HalCommands, HalStatus};
use rcc_common::ride::command::{Command, MotorCommand};
use rcc_common::ride::config::RccConfig;
use rcc_common::ride::error::{PreconditionError, StaleTelemetryError};
use rcc_common::ride::motor::{
    DockPosition, JogDirection, MotorActivity, MotorStatus, SpeedPreset,
};
use rcc_common::ride::state::RideState;
use rcc_hal::HomePersistence;
use tracing::{debug, info, warn};

use super::profile::{ProgramRunner, ProgramStep, SpeedRamp, home_approach};

/// Controller tuning, time values in cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorParams {
    /// Jog preset.
    pub jog_speed: SpeedPreset,
    /// Jog watchdog [cycles].
    pub jog_watchdog_cycles: u64,
    /// Controlled stop deceleration [QPPS/s].
    pub stop_decel: u32,
    /// Stopped threshold [QPPS].
    pub zero_speed_threshold: i32,
    /// Home approach limit [QPPS].
    pub home_speed: i32,
    /// Home approach gain.
    pub home_gain: f64,
    /// Home tolerance [ticks].
    pub home_tolerance: i64,
    /// Cycle period [s].
    pub dt: f64,
}

impl MotorParams {
    /// Derive from the loaded config.
    pub fn from_config(config: &RccConfig) -> Self {
        let motor = &config.motor;
        Self {
            jog_speed: motor.jog_speed,
            jog_watchdog_cycles: u64::from(config.ms_to_cycles(motor.jog_watchdog_ms)),
            stop_decel: motor.stop_decel,
            zero_speed_threshold: motor.zero_speed_threshold,
            home_speed: motor.home_speed,
            home_gain: motor.home_gain,
            home_tolerance: motor.home_tolerance,
            dt: config.dt_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JogRequest {
    direction: JogDirection,
    deadline: u64,
}

/// Drive, encoder and dock servo controller.
#[derive(Debug)]
pub struct MotorController {
    params: MotorParams,
    program: ProgramRunner,
    status: MotorStatus,
    persistence: Option<HomePersistence>,
    persistence_failed: bool,
    ramp: SpeedRamp,
    jog: Option<JogRequest>,
    homing: bool,
    dock_target: Option<DockPosition>,
}

impl MotorController {
    /// Build the controller and load the persisted home reference.
    ///
    /// A home that cannot be loaded starts at 0 and flags a persistence
    /// failure; it is never fatal.
    pub fn new(config: &RccConfig, persistence: Option<HomePersistence>) -> Self {
        let mut persistence_failed = false;
        let home = match persistence.as_ref().map(HomePersistence::load) {
            Some(Ok(Some(home))) => home,
            Some(Ok(None)) | None => 0,
            Some(Err(e)) => {
                warn!("Home position not loaded, starting from 0: {e}");
                persistence_failed = true;
                0
            }
        };

        Self {
            params: MotorParams::from_config(config),
            program: ProgramRunner::new(&config.ride, config.cycle.cycle_time_us),
            status: MotorStatus {
                encoder_home_position: home,
                outputs_enabled: true,
                ..MotorStatus::default()
            },
            persistence,
            persistence_failed,
            ramp: SpeedRamp::default(),
            jog: None,
            homing: false,
            dock_target: None,
        }
    }

    // ─── Operations ─────────────────────────────────────────────────

    /// Jog in `direction` until the watchdog expires. Re-issue to continue.
    pub fn jog(
        &mut self,
        direction: JogDirection,
        state: RideState,
        cycle: u64,
    ) -> Result<(), PreconditionError> {
        let command = Command::Jog(direction);
        if !state.accepts_manual_motion() {
            return Err(PreconditionError::InvalidState { command, state });
        }
        if !self.status.outputs_enabled {
            return Err(PreconditionError::OutputsDisabled { command });
        }
        self.homing = false;
        self.jog = Some(JogRequest {
            direction,
            deadline: cycle + self.params.jog_watchdog_cycles,
        });
        Ok(())
    }

    /// Drive the loading dock servo to `position`.
    pub fn set_loading_dock(
        &mut self,
        position: DockPosition,
        state: RideState,
    ) -> Result<(), PreconditionError> {
        if state.is_ride_motion() {
            return Err(PreconditionError::InvalidState {
                command: Command::SetDock(position),
                state,
            });
        }
        if self.dock_target != Some(position) {
            info!("Loading dock → {position:?}");
        }
        self.dock_target = Some(position);
        Ok(())
    }

    /// Take the current encoder reading as the new home and persist it.
    ///
    /// A failed save keeps the new home in memory and sets the persistence
    /// failure flag; only RUNNING rejects the call.
    pub fn reset_encoder_home(&mut self, state: RideState) -> Result<i64, PreconditionError> {
        if state == RideState::Running {
            return Err(PreconditionError::NotIdle);
        }
        let home = self.status.encoder_position;
        self.status.encoder_home_position = home;
        if let Some(persistence) = &self.persistence {
            match persistence.save(home) {
                Ok(()) => self.persistence_failed = false,
                Err(e) => {
                    warn!("Home position kept in memory only: {e}");
                    self.persistence_failed = true;
                }
            }
        }
        Ok(home)
    }

    /// De-energize actuator outputs. Always accepted.
    pub fn disable_servos(&mut self) {
        if self.status.outputs_enabled {
            warn!("Actuator outputs disabled");
        }
        self.status.outputs_enabled = false;
        self.cancel_manual();
    }

    /// Re-arm actuator outputs.
    pub fn enable_servos(&mut self, state: RideState) -> Result<(), PreconditionError> {
        if state.is_ride_motion() {
            return Err(PreconditionError::InvalidState {
                command: Command::EnableServos,
                state,
            });
        }
        if !self.status.outputs_enabled {
            info!("Actuator outputs enabled");
        }
        self.status.outputs_enabled = true;
        Ok(())
    }

    /// Drive to the home reference. Cancelled by jog or any non-manual command.
    pub fn go_home(&mut self, state: RideState) -> Result<(), PreconditionError> {
        let command = Command::GoHome;
        if !state.accepts_manual_motion() {
            return Err(PreconditionError::InvalidState { command, state });
        }
        if !self.status.outputs_enabled {
            return Err(PreconditionError::OutputsDisabled { command });
        }
        self.jog = None;
        self.homing = true;
        Ok(())
    }

    /// Last sampled telemetry and current setpoints. Never fails.
    #[inline]
    pub fn status(&self) -> MotorStatus {
        self.status
    }

    /// Whether the last home load/save failed.
    #[inline]
    pub fn persistence_failed(&self) -> bool {
        self.persistence_failed
    }

    // ─── Cycle Routines ─────────────────────────────────────────────

    /// Fold one driver sample into the status.
    ///
    /// A failed sample keeps the previous values and counts a stale cycle.
    pub fn ingest(
        &mut self,
        sample: &Result<HalStatus, HalError>,
    ) -> Result<(), StaleTelemetryError> {
        match sample {
            Ok(s) => {
                let st = &mut self.status;
                st.encoder_position = s.encoder_position;
                st.encoder_ok = s.encoder_ok;
                st.motor_speed = s.speed;
                st.motor_current = s.current;
                st.power_supply_voltage = s.supply_voltage;
                st.motor_controller_status = s.controller;
                st.dock = s.dock;
                st.stale_cycles = 0;
                Ok(())
            }
            Err(e) => {
                self.status.stale_cycles = self.status.stale_cycles.saturating_add(1);
                Err(StaleTelemetryError {
                    stale_cycles: self.status.stale_cycles,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Compute this cycle's driver setpoints for `command`.
    pub fn control(&mut self, command: MotorCommand, cycle: u64) -> HalCommands {
        let p = self.params;
        let armed = self.status.outputs_enabled;

        if command != MotorCommand::Manual {
            self.cancel_manual();
        }
        if command != MotorCommand::RunProgram {
            self.program.reset();
            self.status.program_complete = false;
        }

        let drive = match command {
            MotorCommand::SafeStop | MotorCommand::Disable => None,
            _ if !armed => None,
            MotorCommand::ControlledStop | MotorCommand::Hold => {
                Some((0, p.stop_decel, MotorActivity::Holding))
            }
            MotorCommand::Manual => Some(self.manual(cycle)),
            MotorCommand::RunProgram => Some(self.run_program()),
        };

        let (speed, accel) = match drive {
            Some((target, accel, activity)) => {
                let speed = self.ramp.step(target, accel, p.dt);
                self.status.activity = match activity {
                    MotorActivity::Holding if speed != 0 => MotorActivity::Stopping,
                    other => other,
                };
                (speed, accel)
            }
            None => {
                self.ramp.reset(0);
                self.status.activity = MotorActivity::Disabled;
                (0, 0)
            }
        };
        self.status.commanded_speed = speed;

        HalCommands {
            drive_enabled: drive.is_some(),
            speed,
            accel,
            servos_enabled: armed && command != MotorCommand::SafeStop,
            dock_target: self.dock_target,
        }
    }

    fn manual(&mut self, cycle: u64) -> (i32, u32, MotorActivity) {
        let p = self.params;
        if let Some(jog) = self.jog {
            if cycle <= jog.deadline {
                return (
                    jog.direction.sign() * p.jog_speed.qpps(),
                    p.jog_speed.accel(),
                    MotorActivity::Jogging {
                        direction: jog.direction,
                    },
                );
            }
            debug!("Jog watchdog expired");
            self.jog = None;
        }
        if self.homing {
            if self.at_home() {
                info!(
                    "Home position reached (encoder={})",
                    self.status.encoder_position
                );
                self.homing = false;
            } else {
                return (
                    home_approach(self.home_error(), p.home_gain, p.home_speed),
                    SpeedPreset::Medium.accel(),
                    MotorActivity::Homing,
                );
            }
        }
        (0, p.stop_decel, MotorActivity::Holding)
    }

    fn run_program(&mut self) -> (i32, u32, MotorActivity) {
        let p = self.params;
        let (target, accel, index) = match self.program.advance() {
            ProgramStep::Phase {
                index,
                target,
                accel,
            } => (target, accel, index),
            ProgramStep::ReturnHome { index } => {
                if self.at_home() {
                    info!("Ride program returned home");
                    self.program.finish();
                    (0, p.stop_decel, index)
                } else {
                    (
                        home_approach(self.home_error(), p.home_gain, p.home_speed),
                        SpeedPreset::Medium.accel(),
                        index,
                    )
                }
            }
            ProgramStep::Done { index } => (0, p.stop_decel, index),
        };
        self.status.program_complete =
            self.program.is_done() && self.status.motor_speed.abs() <= p.zero_speed_threshold;
        (target, accel, MotorActivity::RideProgram { phase: index })
    }

    fn home_error(&self) -> i64 {
        self.status.encoder_home_position - self.status.encoder_position
    }

    fn at_home(&self) -> bool {
        self.home_error().abs() <= self.params.home_tolerance
            && self.status.motor_speed.abs() <= self.params.zero_speed_threshold
    }

    fn cancel_manual(&mut self) {
        self.jog = None;
        self.homing = false;
    }
}
