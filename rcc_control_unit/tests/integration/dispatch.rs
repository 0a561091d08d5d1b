//! Integration test: dispatch, ride program and operator stop.
//!
//! Verifies:
//! 1. IDLE → DISPATCH_PENDING → RUNNING → IDLE for a complete ride
//! 2. Dispatch preconditions (dock, power, state)
//! 3. STOP → STOPPING → STOPPED → RESTART → IDLE

use rcc_common::ride::command::{Command, MotorCommand};
use rcc_common::ride::error::PreconditionError;
use rcc_common::ride::input::InputFlags;
use rcc_common::ride::motor::{DockPosition, DockState, MotorActivity};
use rcc_common::ride::state::RideState;
use rcc_control_unit::gateway::GatewayError;
use tempfile::TempDir;

use super::{Rig, test_config};

#[test]
fn full_ride_returns_home_and_idles() {
    let mut rig = Rig::idle();
    rig.start_ride();
    assert!(rig.logged("IDLE → DISPATCH_PENDING: DISPATCH accepted"));
    assert!(rig.logged("DISPATCH_PENDING → RUNNING: motion confirmed"));
    assert_eq!(rig.snapshot().motor_command, MotorCommand::RunProgram);
    assert!(matches!(
        rig.snapshot().motor.activity,
        MotorActivity::RideProgram { phase: 0 }
    ));

    assert!(rig.step_until(3000, |s| s.state == RideState::Idle));
    assert!(rig.logged("RUNNING → IDLE: ride complete"));
    let motor = rig.snapshot().motor;
    assert!(motor.relative_position().abs() <= 20, "{motor:?}");
    assert!(motor.motor_speed.abs() <= 5);
    assert!(rig.snapshot().faults.is_empty());
}

#[test]
fn program_runs_phases_in_order() {
    let mut rig = Rig::idle();
    rig.start_ride();
    assert!(rig.step_until(200, |s| matches!(
        s.motor.activity,
        MotorActivity::RideProgram { phase: 1 }
    )));
    assert!(rig.snapshot().motor.relative_position() > 0);
    assert!(rig.step_until(200, |s| matches!(
        s.motor.activity,
        MotorActivity::RideProgram { phase: 2 }
    )));
    assert_eq!(rig.state(), RideState::Running);
}

#[test]
fn physical_dispatch_under_physical_authority() {
    let mut rig = Rig::idle();
    rig.tap(InputFlags::DISPATCH);
    assert_eq!(rig.state(), RideState::DispatchPending);
    assert!(rig.step_until(20, |s| s.state == RideState::Running));
    assert!(rig.step_until(3000, |s| s.state == RideState::Idle));
}

#[test]
fn held_dispatch_starts_only_one_ride() {
    let mut rig = Rig::idle();
    rig.sim.press(InputFlags::DISPATCH);
    assert!(rig.step_until(3000, |s| s.state == RideState::Idle));
    rig.step(10);
    assert_eq!(rig.state(), RideState::Idle);
}

#[test]
fn dispatch_rejected_while_dock_raised() {
    let mut rig = Rig::idle_web();
    rig.submit(Command::SetDock(DockPosition::Raised));
    // Target written this cycle, travel sampled the next.
    rig.step(2);
    assert_eq!(rig.snapshot().motor.dock, DockState::Raising);
    assert!(matches!(
        rig.gateway.submit(Command::Dispatch),
        Err(GatewayError::Precondition(PreconditionError::DockNotReady {
            dock: DockState::Raising,
            ..
        }))
    ));

    assert!(rig.step_until(100, |s| s.motor.dock == DockState::Raised));
    assert!(matches!(
        rig.gateway.submit(Command::Dispatch),
        Err(GatewayError::Precondition(PreconditionError::DockNotReady { .. }))
    ));

    rig.submit(Command::SetDock(DockPosition::Lowered));
    assert!(rig.step_until(100, |s| s.motor.dock == DockState::Lowered));
    rig.submit(Command::Dispatch);
    rig.step(1);
    assert_eq!(rig.state(), RideState::DispatchPending);
}

#[test]
fn dock_cannot_move_during_ride() {
    let mut rig = Rig::idle();
    rig.start_ride();
    assert!(matches!(
        rig.gateway.submit(Command::SetDock(DockPosition::Raised)),
        Err(GatewayError::Precondition(PreconditionError::InvalidState {
            state: RideState::Running,
            ..
        }))
    ));
}

#[test]
fn dispatch_rejected_outside_idle() {
    let mut rig = Rig::idle();
    rig.start_ride();
    assert!(matches!(
        rig.gateway.submit(Command::Dispatch),
        Err(GatewayError::Precondition(PreconditionError::InvalidState {
            state: RideState::Running,
            ..
        }))
    ));
}

#[test]
fn stop_then_restart_returns_to_idle() {
    let mut rig = Rig::idle();
    rig.start_ride();
    rig.step(20);

    rig.submit(Command::Stop);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Stopping);
    assert_eq!(rig.snapshot().motor_command, MotorCommand::ControlledStop);
    assert!(rig.logged("RUNNING → STOPPING: STOP asserted"));

    assert!(rig.step_until(200, |s| s.state == RideState::Stopped));
    assert!(rig.logged("STOPPING → STOPPED: zero speed confirmed"));
    assert_eq!(rig.snapshot().motor_command, MotorCommand::Disable);

    // STOPPED waits for an explicit RESTART.
    rig.step(50);
    assert_eq!(rig.state(), RideState::Stopped);

    rig.submit(Command::Restart);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Idle);
    assert!(rig.logged("STOPPED → IDLE: RESTART accepted"));
}

#[test]
fn physical_stop_during_dispatch_pending() {
    let mut rig = Rig::idle_web();
    rig.submit(Command::Dispatch);
    rig.step(1);
    assert_eq!(rig.state(), RideState::DispatchPending);

    rig.tap(InputFlags::STOP);
    assert_eq!(rig.state(), RideState::Stopping);
    assert!(rig.step_until(200, |s| s.state == RideState::Stopped));

    rig.tap(InputFlags::RESTART);
    assert_eq!(rig.state(), RideState::Idle);
}

#[test]
fn held_stop_blocks_dispatch() {
    let mut rig = Rig::idle();
    rig.sim.press(InputFlags::STOP);
    rig.step(1);
    rig.tap(InputFlags::DISPATCH);
    assert_eq!(rig.state(), RideState::Idle);
    assert_eq!(rig.snapshot().motor_command, MotorCommand::Hold);
}

#[test]
fn web_ride_off_toggles_power() {
    let mut rig = Rig::idle_web();
    rig.submit(Command::RideOff);
    rig.step(1);
    assert!(!rig.snapshot().powered);
    assert_eq!(rig.state(), RideState::Idle);
    assert_eq!(rig.snapshot().motor_command, MotorCommand::Disable);
    assert!(rig.logged("Ride powered off"));

    assert!(matches!(
        rig.gateway.submit(Command::Dispatch),
        Err(GatewayError::Precondition(PreconditionError::RideOff { .. }))
    ));

    rig.submit(Command::RideOff);
    rig.step(1);
    assert!(rig.snapshot().powered);
    assert!(rig.logged("Ride powered on"));
    rig.submit(Command::Dispatch);
    rig.step(1);
    assert_eq!(rig.state(), RideState::DispatchPending);
}

#[test]
fn ride_off_rejected_outside_idle() {
    let mut rig = Rig::idle();
    rig.start_ride();
    assert!(matches!(
        rig.gateway.submit(Command::RideOff),
        Err(GatewayError::Precondition(PreconditionError::InvalidState { .. }))
    ));
}

#[test]
fn return_home_only_program_completes_at_home() {
    let mut config = test_config(None);
    config.ride.phases.clear();
    let mut rig = Rig::with_config(config, TempDir::new().unwrap());
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));

    rig.tap(InputFlags::DISPATCH);
    assert_eq!(rig.state(), RideState::DispatchPending);
    assert!(rig.step_until(20, |s| s.state == RideState::Idle));
    assert!(rig.logged("DISPATCH_PENDING → IDLE: ride complete"));
    assert!(rig.snapshot().faults.is_empty());
    assert_eq!(rig.snapshot().motor.relative_position(), 0);
}
