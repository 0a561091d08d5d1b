//! Ride state machine.
//!
//! Sole writer of [`RideState`] and the orthogonal `powered` flag. Rules are
//! evaluated every cycle in priority order; the safety rules (ESTOP, ESTOP
//! recovery, CRITICAL fault, FAULT recovery) always run before operator
//! intent (STOP, RIDE_OFF, DISPATCH, MAINTENANCE).
//!
//! ```text
//!  INIT ──self-test──► IDLE ──DISPATCH──► DISPATCH_PENDING ──motion──► RUNNING
//!   ▲                  │  ▲                      │ STOP                 │ STOP
//!   │ RESTART    maint │  │ cleared              ▼                      ▼
//!  ESTOP               ▼  FAULT               STOPPING ──zero speed──► STOPPED
//!                 MAINTENANCE
//! ```
//!
//! [`RideStateMachine::step`] is a pure function of the prior machine and the
//! cycle's inputs; [`RideStateMachine::handle_cycle`] applies it in place.

use std::collections::BTreeMap;

use rcc_common::ride::command::MotorCommand;
use rcc_common::ride::config::RccConfig;
use rcc_common::ride::fault::{Fault, FaultCode, FaultSeverity};
use rcc_common::ride::input::EffectiveInputs;
use rcc_common::ride::motor::{DockPosition, MotorStatus};
use rcc_common::ride::state::RideState;

/// Explicit maintenance command, already gated by authority and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceRequest {
    /// Enter MAINTENANCE.
    Enter,
    /// Return to IDLE.
    Exit,
}

/// Per-cycle inputs beyond faults and motor status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineInputs {
    /// Effective inputs after authority arbitration.
    pub inputs: EffectiveInputs,
    /// Authority flipped this cycle.
    pub authority_changed: bool,
    /// Pending maintenance command.
    pub maintenance: Option<MaintenanceRequest>,
}

/// Sequencing parameters, time values in cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineParams {
    /// Clean cycles to pass the INIT self-test.
    pub self_test_cycles: u32,
    /// Clean cycles before FAULT returns to IDLE.
    pub fault_recovery_cycles: u32,
    /// Cycles DISPATCH_PENDING waits for pre-motion checks.
    pub dispatch_timeout_cycles: u32,
    /// Dock position required before the program starts.
    pub dispatch_dock: DockPosition,
    /// Stopped threshold [QPPS].
    pub zero_speed_threshold: i32,
    /// Motion-confirm threshold [QPPS].
    pub motion_confirm_speed: i32,
}

impl MachineParams {
    /// Derive from the loaded config.
    pub fn from_config(config: &RccConfig) -> Self {
        Self {
            self_test_cycles: config.sequence.self_test_cycles,
            fault_recovery_cycles: config.sequence.fault_recovery_cycles,
            dispatch_timeout_cycles: config.ms_to_cycles(config.sequence.dispatch_timeout_ms),
            dispatch_dock: config.sequence.dispatch_dock,
            zero_speed_threshold: config.motor.zero_speed_threshold,
            motion_confirm_speed: config.motor.motion_confirm_speed,
        }
    }
}

impl Default for MachineParams {
    fn default() -> Self {
        Self::from_config(&RccConfig::default())
    }
}

/// A state change and why it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Previous state.
    pub from: RideState,
    /// New state.
    pub to: RideState,
    /// Short operator-facing reason.
    pub reason: &'static str,
}

/// Output of one machine cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleDecision {
    /// State after this cycle.
    pub state: RideState,
    /// Powered flag after this cycle.
    pub powered: bool,
    /// Command for the motor controller.
    pub motor_command: MotorCommand,
    /// Set when the state changed.
    pub transition: Option<Transition>,
    /// Set when the powered flag changed.
    pub power_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FaultLevel {
    any: bool,
    critical: bool,
    estop: bool,
}

impl FaultLevel {
    fn of(faults: &BTreeMap<FaultCode, Fault>) -> Self {
        let worst = faults.values().map(|f| f.severity).max();
        Self {
            any: worst.is_some(),
            critical: worst >= Some(FaultSeverity::Critical),
            estop: worst == Some(FaultSeverity::EstopLevel),
        }
    }
}

/// Supervisory ride state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideStateMachine {
    state: RideState,
    powered: bool,
    prev: EffectiveInputs,
    params: MachineParams,
    self_test: u32,
    recovery: u32,
    pending: u32,
    program_started: bool,
    motion_wait: u32,
    running: u32,
}

impl RideStateMachine {
    /// New machine in INIT, ride powered.
    pub const fn new(params: MachineParams) -> Self {
        Self {
            state: RideState::Init,
            powered: true,
            prev: EffectiveInputs {
                estop: false,
                stop: false,
                dispatch: false,
                ride_off: false,
                restart: false,
            },
            params,
            self_test: 0,
            recovery: 0,
            pending: 0,
            program_started: false,
            motion_wait: 0,
            running: 0,
        }
    }

    /// Current state.
    #[inline]
    pub const fn current_state(&self) -> RideState {
        self.state
    }

    /// Ride subsystem powered.
    #[inline]
    pub const fn powered(&self) -> bool {
        self.powered
    }

    /// Cycles spent in RUNNING.
    #[inline]
    pub const fn running_cycles(&self) -> u32 {
        self.running
    }

    /// Cycles since the program started in DISPATCH_PENDING without motion.
    #[inline]
    pub const fn motion_wait_cycles(&self) -> u32 {
        self.motion_wait
    }

    /// Whether this cycle's inputs carry a RESTART the machine will accept.
    ///
    /// Lets the caller acknowledge resolved faults before the cycle runs.
    pub fn wants_restart(&self, input: &MachineInputs) -> bool {
        let eff = input.inputs;
        eff.restart
            && !self.prev.restart
            && !input.authority_changed
            && !eff.estop
            && matches!(
                self.state,
                RideState::Estop | RideState::Fault | RideState::Stopped
            )
    }

    /// Next machine and decision, without touching `self`.
    pub fn step(
        &self,
        input: &MachineInputs,
        faults: &BTreeMap<FaultCode, Fault>,
        motor: &MotorStatus,
    ) -> (Self, CycleDecision) {
        let mut next = *self;
        let level = FaultLevel::of(faults);
        let (target, reason) = next.decide(input, level, motor);
        next.prev = input.inputs;

        let transition = (target != self.state).then(|| {
            next.enter(target);
            Transition {
                from: self.state,
                to: target,
                reason,
            }
        });

        let decision = CycleDecision {
            state: next.state,
            powered: next.powered,
            motor_command: next.motor_command(input.inputs),
            transition,
            power_changed: next.powered != self.powered,
        };
        (next, decision)
    }

    /// Advance one cycle in place.
    pub fn handle_cycle(
        &mut self,
        input: &MachineInputs,
        faults: &BTreeMap<FaultCode, Fault>,
        motor: &MotorStatus,
    ) -> CycleDecision {
        let (next, decision) = self.step(input, faults, motor);
        *self = next;
        decision
    }

    /// Rule evaluation. May update counters and `powered`; returns the target state.
    fn decide(
        &mut self,
        input: &MachineInputs,
        faults: FaultLevel,
        motor: &MotorStatus,
    ) -> (RideState, &'static str) {
        use RideState::*;

        let p = self.params;
        let eff = input.inputs;
        let gated = !input.authority_changed;
        let dispatch_edge = eff.dispatch && !self.prev.dispatch;
        let restart_edge = eff.restart && !self.prev.restart;
        let stopped = motor.motor_speed.abs() <= p.zero_speed_threshold;
        let stay = (self.state, "");

        // 1. ESTOP from anywhere.
        if eff.estop {
            return (Estop, "ESTOP input asserted");
        }
        if faults.estop {
            return (Estop, "ESTOP-level fault active");
        }

        // 2. ESTOP recovery.
        if self.state == Estop {
            if restart_edge && gated {
                return (Init, "RESTART accepted");
            }
            return stay;
        }

        // 3. CRITICAL fault.
        if faults.critical && self.state != Fault {
            return (Fault, "CRITICAL fault active");
        }

        // 4. FAULT self-heal.
        if self.state == Fault {
            if !faults.critical && stopped {
                self.recovery += 1;
                if self.recovery >= p.fault_recovery_cycles {
                    return (Idle, "faults cleared");
                }
            } else {
                self.recovery = 0;
            }
            return stay;
        }

        // 5-8. Operator intent.
        match self.state {
            Init => {
                let clean = motor.is_fresh() && motor.encoder_ok && stopped;
                self.self_test = if clean { self.self_test + 1 } else { 0 };
                if self.self_test >= p.self_test_cycles {
                    return (Idle, "self-test passed");
                }
            }

            Idle => {
                // Power-down follows the level, power-up needs RIDE_OFF to
                // fall. Masking a web latch by authority is not a release.
                if gated {
                    if eff.ride_off {
                        self.powered = false;
                    } else if self.prev.ride_off && !self.powered {
                        self.powered = true;
                    }
                }
                if gated && input.maintenance == Some(MaintenanceRequest::Enter) && self.powered
                {
                    return (Maintenance, "maintenance entered");
                }
                if gated
                    && dispatch_edge
                    && self.powered
                    && !eff.ride_off
                    && !eff.stop
                    && !faults.any
                {
                    return (DispatchPending, "DISPATCH accepted");
                }
            }

            DispatchPending => {
                if eff.stop {
                    return (Stopping, "STOP asserted");
                }
                self.pending += 1;
                if !self.program_started {
                    if self.pre_motion_ok(motor) {
                        self.program_started = true;
                    } else if self.pending > p.dispatch_timeout_cycles {
                        return (Idle, "pre-motion checks timed out");
                    }
                } else if motor.motor_speed.abs() >= p.motion_confirm_speed {
                    return (Running, "motion confirmed");
                } else if motor.program_complete && stopped {
                    // Return-home-only program dispatched at home.
                    return (Idle, "ride complete");
                } else {
                    self.motion_wait += 1;
                }
            }

            Running => {
                if eff.stop {
                    return (Stopping, "STOP asserted");
                }
                self.running += 1;
                if motor.program_complete && stopped {
                    return (Idle, "ride complete");
                }
            }

            Stopping => {
                if stopped {
                    return (Stopped, "zero speed confirmed");
                }
            }

            Stopped => {
                if gated && restart_edge {
                    return (Idle, "RESTART accepted");
                }
                if gated && input.maintenance == Some(MaintenanceRequest::Enter) && self.powered
                {
                    return (Maintenance, "maintenance entered");
                }
            }

            Maintenance => {
                if gated && input.maintenance == Some(MaintenanceRequest::Exit) {
                    return (Idle, "maintenance exited");
                }
            }

            Fault | Estop => {}
        }
        stay
    }

    fn pre_motion_ok(&self, motor: &MotorStatus) -> bool {
        motor.outputs_enabled
            && motor.encoder_ok
            && motor.is_fresh()
            && motor.dock.at_rest() == Some(self.params.dispatch_dock)
    }

    fn enter(&mut self, state: RideState) {
        self.state = state;
        self.self_test = 0;
        self.recovery = 0;
        self.pending = 0;
        self.program_started = false;
        self.motion_wait = 0;
        self.running = 0;
    }

    fn motor_command(&self, eff: EffectiveInputs) -> MotorCommand {
        match self.state {
            RideState::Estop => MotorCommand::SafeStop,
            RideState::Fault | RideState::Stopping => MotorCommand::ControlledStop,
            RideState::Init | RideState::Stopped => MotorCommand::Disable,
            RideState::Idle if !self.powered => MotorCommand::Disable,
            RideState::Idle | RideState::Maintenance if eff.stop => MotorCommand::Hold,
            RideState::Idle | RideState::Maintenance => MotorCommand::Manual,
            RideState::DispatchPending if self.program_started => MotorCommand::RunProgram,
            RideState::DispatchPending => MotorCommand::Hold,
            RideState::Running => MotorCommand::RunProgram,
        }
    }
}

impl Default for RideStateMachine {
    fn default() -> Self {
        Self::new(MachineParams::default())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
