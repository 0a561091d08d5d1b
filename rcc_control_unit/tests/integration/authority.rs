//! Integration test: control authority arbitration.
//!
//! Verifies:
//! 1. Web safety commands are honored under either authority
//! 2. Web intent commands require WEB authority; dock and home do not
//! 3. Physical DISPATCH is ignored under WEB; RIDE_OFF is not
//! 4. The cycle in which authority flips never changes ride state

use rcc_common::ride::command::Command;
use rcc_common::ride::error::PreconditionError;
use rcc_common::ride::input::{InputFlags, InputName, InputSource};
use rcc_common::ride::motor::{DockPosition, DockState, JogDirection};
use rcc_common::ride::state::{ControlAuthority, RideState};
use rcc_control_unit::gateway::GatewayError;

use super::Rig;

fn assert_authority_required(rig: &Rig, command: Command) {
    match rig.gateway.submit(command) {
        Err(GatewayError::Precondition(PreconditionError::AuthorityRequired {
            command: rejected,
            authority: ControlAuthority::Physical,
        })) => assert_eq!(rejected, command),
        other => panic!("{command}: expected AuthorityRequired, got {other:?}"),
    }
}

#[test]
fn starts_under_physical_authority() {
    let rig = Rig::idle();
    assert_eq!(rig.snapshot().authority, ControlAuthority::Physical);
}

#[test]
fn web_commands_need_web_authority() {
    let rig = Rig::idle();
    for command in [
        Command::Dispatch,
        Command::RideOff,
        Command::Restart,
        Command::MaintenanceEnter,
        Command::Jog(JogDirection::Forward),
        Command::GoHome,
    ] {
        assert_authority_required(&rig, command);
    }
}

#[test]
fn dock_and_home_accepted_under_physical() {
    let mut rig = Rig::idle();
    rig.submit(Command::SetDock(DockPosition::Raised));
    assert!(rig.step_until(100, |s| s.motor.dock == DockState::Raised));
    rig.submit(Command::SetDock(DockPosition::Lowered));
    assert!(rig.step_until(100, |s| s.motor.dock == DockState::Lowered));

    rig.submit(Command::ResetEncoder);
    rig.step(1);
    assert!(rig.logged("Encoder home set to"));
    rig.submit(Command::EnableServos);
    rig.step(1);
    assert_eq!(rig.snapshot().authority, ControlAuthority::Physical);
    assert!(rig.snapshot().motor.outputs_enabled);
}

#[test]
fn safety_commands_bypass_authority() {
    let mut rig = Rig::idle();
    rig.submit(Command::Heartbeat);
    rig.submit(Command::Stop);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Idle);
    assert!(rig.logged("Web STOP"));

    rig.submit(Command::Estop);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Estop);
    rig.submit(Command::EstopRelease);
    rig.step(1);
    assert!(rig.logged("Web ESTOP released"));
}

#[test]
fn web_stop_halts_physically_dispatched_ride() {
    let mut rig = Rig::idle();
    rig.tap(InputFlags::DISPATCH);
    assert_eq!(rig.state(), RideState::DispatchPending);
    assert!(rig.step_until(20, |s| s.state == RideState::Running));

    rig.submit(Command::Stop);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Stopping);
}

#[test]
fn physical_dispatch_ignored_under_web() {
    let mut rig = Rig::idle_web();
    rig.tap(InputFlags::DISPATCH);
    rig.step(2);
    assert_eq!(rig.state(), RideState::Idle);
    assert!(!rig.snapshot().inputs.dispatch);

    // The raw reading is still reported.
    let reading = rig
        .snapshot()
        .readings
        .iter()
        .find(|r| r.name == InputName::Dispatch && r.source == InputSource::Physical)
        .copied()
        .unwrap();
    assert!(reading.timestamp > 0);
}

#[test]
fn physical_ride_off_honored_under_web() {
    let mut rig = Rig::idle_web();
    rig.sim.press(InputFlags::RIDE_OFF);
    rig.step(1);
    assert!(!rig.snapshot().powered);
    assert!(rig.logged("Ride powered off"));

    rig.sim.release(InputFlags::RIDE_OFF);
    rig.step(1);
    assert!(rig.snapshot().powered);
}

#[test]
fn toggle_cycle_suppresses_ride_off() {
    let mut rig = Rig::idle();
    rig.sim.press(InputFlags::RIDE_OFF);
    rig.submit(Command::ToggleWebControls);
    rig.step(1);
    assert_eq!(rig.snapshot().authority, ControlAuthority::Web);
    assert!(rig.snapshot().powered);

    // Level input: honored on the following cycle.
    rig.step(1);
    assert!(!rig.snapshot().powered);
}

#[test]
fn web_ride_off_survives_toggle_to_physical() {
    let mut rig = Rig::idle_web();
    rig.submit(Command::RideOff);
    rig.step(2);
    assert!(!rig.snapshot().powered);

    rig.submit(Command::ToggleWebControls);
    rig.step(1);
    assert_eq!(rig.snapshot().authority, ControlAuthority::Physical);
    rig.step(5);
    assert!(!rig.snapshot().powered);
    assert_eq!(rig.state(), RideState::Idle);

    // A physical press and release powers the ride back on.
    rig.sim.press(InputFlags::RIDE_OFF);
    rig.step(1);
    rig.sim.release(InputFlags::RIDE_OFF);
    rig.step(1);
    assert!(rig.snapshot().powered);
}

#[test]
fn toggle_cycle_consumes_dispatch_edge() {
    let mut rig = Rig::idle_web();
    rig.sim.press(InputFlags::DISPATCH);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Idle);

    // Back to PHYSICAL while DISPATCH is held: no transition now, and the
    // held button is not a fresh request later.
    rig.submit(Command::ToggleWebControls);
    rig.step(1);
    assert_eq!(rig.snapshot().authority, ControlAuthority::Physical);
    assert!(rig.snapshot().inputs.dispatch);
    assert_eq!(rig.state(), RideState::Idle);
    rig.step(5);
    assert_eq!(rig.state(), RideState::Idle);

    rig.sim.release(InputFlags::DISPATCH);
    rig.step(1);
    rig.tap(InputFlags::DISPATCH);
    assert_eq!(rig.state(), RideState::DispatchPending);
}

#[test]
fn toggle_while_running_keeps_state() {
    let mut rig = Rig::idle();
    rig.start_ride();
    rig.submit(Command::ToggleWebControls);
    rig.step(1);
    assert_eq!(rig.snapshot().authority, ControlAuthority::Physical);
    assert_eq!(rig.state(), RideState::Running);
    assert!(rig.logged("Control authority → PHYSICAL"));
}

#[test]
fn double_toggle_is_no_change() {
    let mut rig = Rig::idle();
    rig.submit(Command::ToggleWebControls);
    rig.submit(Command::ToggleWebControls);
    rig.sim.press(InputFlags::DISPATCH);
    rig.step(1);
    assert_eq!(rig.snapshot().authority, ControlAuthority::Physical);
    assert_eq!(rig.state(), RideState::DispatchPending);
}
