//! Integration test: maintenance mode and manual motion.

use rcc_common::ride::command::{Command, MotorCommand};
use rcc_common::ride::error::PreconditionError;
use rcc_common::ride::input::InputFlags;
use rcc_common::ride::motor::{JogDirection, MotorActivity};
use rcc_common::ride::state::RideState;
use rcc_control_unit::gateway::GatewayError;

use super::Rig;

fn maintenance() -> Rig {
    let mut rig = Rig::idle_web();
    rig.submit(Command::MaintenanceEnter);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Maintenance);
    rig
}

/// Jog by re-issuing the command every 10 cycles.
fn hold_jog(rig: &mut Rig, direction: JogDirection, cycles: u32) {
    for _ in 0..cycles / 10 {
        rig.submit(Command::Jog(direction));
        rig.step(10);
    }
}

#[test]
fn enter_and_exit() {
    let mut rig = maintenance();
    assert!(rig.logged("IDLE → MAINTENANCE: maintenance entered"));
    assert_eq!(rig.snapshot().motor_command, MotorCommand::Manual);

    rig.submit(Command::MaintenanceExit);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Idle);
    assert!(rig.logged("MAINTENANCE → IDLE: maintenance exited"));
}

#[test]
fn enter_requires_web_authority() {
    let rig = Rig::idle();
    assert!(matches!(
        rig.gateway.submit(Command::MaintenanceEnter),
        Err(GatewayError::Precondition(PreconditionError::AuthorityRequired { .. }))
    ));
}

#[test]
fn enter_rejected_while_running() {
    let mut rig = Rig::idle();
    rig.start_ride();
    assert!(matches!(
        rig.gateway.submit(Command::MaintenanceEnter),
        Err(GatewayError::Precondition(PreconditionError::InvalidState {
            state: RideState::Running,
            ..
        }))
    ));
}

#[test]
fn enter_from_stopped() {
    let mut rig = Rig::idle();
    rig.start_ride();
    rig.submit(Command::Stop);
    assert!(rig.step_until(200, |s| s.state == RideState::Stopped));

    rig.submit(Command::MaintenanceEnter);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Maintenance);
}

#[test]
fn exit_rejected_outside_maintenance() {
    let rig = Rig::idle_web();
    assert!(matches!(
        rig.gateway.submit(Command::MaintenanceExit),
        Err(GatewayError::Precondition(PreconditionError::InvalidState { .. }))
    ));
}

#[test]
fn dispatch_rejected_in_maintenance() {
    let rig = maintenance();
    assert!(matches!(
        rig.gateway.submit(Command::Dispatch),
        Err(GatewayError::Precondition(PreconditionError::InvalidState {
            state: RideState::Maintenance,
            ..
        }))
    ));
}

#[test]
fn jog_stops_when_not_reissued() {
    let mut rig = maintenance();
    rig.submit(Command::Jog(JogDirection::Forward));
    rig.step(10);
    let motor = rig.snapshot().motor;
    assert_eq!(
        motor.activity,
        MotorActivity::Jogging {
            direction: JogDirection::Forward
        }
    );
    assert!(motor.commanded_speed > 0);

    // Watchdog: 250 ms without a fresh jog.
    assert!(rig.step_until(40, |s| !matches!(s.motor.activity, MotorActivity::Jogging { .. })));
    assert!(rig.step_until(200, |s| s.motor.motor_speed == 0));
    assert_eq!(rig.snapshot().motor.activity, MotorActivity::Holding);
    assert!(rig.snapshot().motor.relative_position() > 0);
    assert_eq!(rig.state(), RideState::Maintenance);
}

#[test]
fn reissued_jog_keeps_moving() {
    let mut rig = maintenance();
    hold_jog(&mut rig, JogDirection::Backward, 100);
    let motor = rig.snapshot().motor;
    assert!(motor.motor_speed < 0);
    assert!(motor.relative_position() < 0);
    assert!(rig.snapshot().faults.is_empty());
}

#[test]
fn go_home_returns_to_reference() {
    let mut rig = maintenance();
    hold_jog(&mut rig, JogDirection::Forward, 100);
    assert!(rig.snapshot().motor.relative_position() > 100);

    rig.submit(Command::GoHome);
    rig.step(30);
    assert_eq!(rig.snapshot().motor.activity, MotorActivity::Homing);
    assert!(rig.step_until(2000, |s| s.motor.activity == MotorActivity::Holding
        && s.motor.motor_speed == 0));
    assert!(rig.snapshot().motor.relative_position().abs() <= 10);
    assert!(rig.snapshot().faults.is_empty());
}

#[test]
fn jog_cancels_go_home() {
    let mut rig = maintenance();
    hold_jog(&mut rig, JogDirection::Forward, 50);
    rig.submit(Command::GoHome);
    rig.step(30);
    assert_eq!(rig.snapshot().motor.activity, MotorActivity::Homing);

    rig.submit(Command::Jog(JogDirection::Forward));
    rig.step(1);
    assert!(matches!(
        rig.snapshot().motor.activity,
        MotorActivity::Jogging { .. }
    ));
    // Homing does not resume after the jog lapses.
    rig.step(60);
    assert_ne!(rig.snapshot().motor.activity, MotorActivity::Homing);
}

#[test]
fn jog_allowed_in_idle() {
    let mut rig = Rig::idle_web();
    rig.submit(Command::Jog(JogDirection::Forward));
    rig.step(5);
    assert!(matches!(
        rig.snapshot().motor.activity,
        MotorActivity::Jogging { .. }
    ));
    assert_eq!(rig.state(), RideState::Idle);
}

#[test]
fn disabled_outputs_block_manual_motion() {
    let mut rig = maintenance();
    rig.submit(Command::DisableServos);
    rig.step(1);
    assert!(!rig.snapshot().motor.outputs_enabled);
    assert_eq!(rig.snapshot().motor.activity, MotorActivity::Disabled);
    assert!(matches!(
        rig.gateway.submit(Command::Jog(JogDirection::Forward)),
        Err(GatewayError::Precondition(PreconditionError::OutputsDisabled { .. }))
    ));
    assert!(matches!(
        rig.gateway.submit(Command::GoHome),
        Err(GatewayError::Precondition(PreconditionError::OutputsDisabled { .. }))
    ));

    rig.submit(Command::EnableServos);
    rig.step(1);
    assert!(rig.snapshot().motor.outputs_enabled);
    rig.submit(Command::Jog(JogDirection::Forward));
    rig.step(1);
    assert!(matches!(
        rig.snapshot().motor.activity,
        MotorActivity::Jogging { .. }
    ));
}

#[test]
fn estop_during_maintenance() {
    let mut rig = maintenance();
    hold_jog(&mut rig, JogDirection::Forward, 30);
    rig.tap(InputFlags::ESTOP);
    assert_eq!(rig.state(), RideState::Estop);
    assert_eq!(rig.snapshot().motor_command, MotorCommand::SafeStop);
    assert_eq!(rig.snapshot().motor.activity, MotorActivity::Disabled);
}
