//! Integration test: encoder home persistence.
//!
//! Verifies:
//! 1. reset_encoder_home saves the home and survives a restart
//! 2. Repeated resets without motion are idempotent
//! 3. Load/save failures raise fault 114 without stopping the loop

use std::fs;

use rcc_common::ride::command::Command;
use rcc_common::ride::error::PreconditionError;
use rcc_common::ride::fault::{FaultCode, FaultSeverity};
use rcc_common::ride::motor::{JogDirection, MotorActivity};
use rcc_common::ride::state::RideState;
use rcc_control_unit::gateway::GatewayError;
use rcc_hal::HomePersistence;
use tempfile::TempDir;

use super::{Rig, test_config};

/// Jog forward, let the watchdog stop the drive, return the encoder count.
fn jog_and_settle(rig: &mut Rig) -> i64 {
    for _ in 0..5 {
        rig.submit(Command::Jog(JogDirection::Forward));
        rig.step(10);
    }
    assert!(rig.step_until(200, |s| s.motor.activity == MotorActivity::Holding
        && s.motor.motor_speed == 0));
    rig.snapshot().motor.encoder_position
}

#[test]
fn reset_encoder_home_persists() {
    let mut rig = Rig::idle_web();
    let position = jog_and_settle(&mut rig);
    assert!(position > 0);

    rig.submit(Command::ResetEncoder);
    rig.step(1);
    let motor = rig.snapshot().motor;
    assert_eq!(motor.encoder_home_position, position);
    assert_eq!(motor.relative_position(), 0);
    assert!(rig.logged(&format!("Encoder home set to {position}")));

    let store = HomePersistence::new(rig.dir.path().join("home.bin"));
    assert_eq!(store.load().unwrap(), Some(position));
}

#[test]
fn reset_twice_is_idempotent() {
    let mut rig = Rig::idle_web();
    let position = jog_and_settle(&mut rig);
    let path = rig.dir.path().join("home.bin");

    rig.submit(Command::ResetEncoder);
    rig.step(1);
    rig.submit(Command::ResetEncoder);
    rig.step(1);
    assert_eq!(rig.snapshot().motor.encoder_home_position, position);
    assert_eq!(HomePersistence::new(&path).load().unwrap(), Some(position));
    assert!(rig.snapshot().faults.is_empty());
}

#[test]
fn home_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("home.bin");
    HomePersistence::new(&path).save(-420).unwrap();

    let mut rig = Rig::with_config(test_config(Some(path)), dir);
    assert_eq!(rig.snapshot().motor.encoder_home_position, -420);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
    // The sim starts at encoder 0, 420 ticks ahead of home.
    assert_eq!(rig.snapshot().motor.relative_position(), 420);
    assert!(rig.snapshot().faults.is_empty());
}

#[test]
fn ride_returns_to_persisted_home() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("home.bin");
    HomePersistence::new(&path).save(300).unwrap();

    let mut rig = Rig::with_config(test_config(Some(path)), dir);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
    rig.start_ride();
    assert!(rig.step_until(3000, |s| s.state == RideState::Idle));
    assert!((rig.snapshot().motor.encoder_position - 300).abs() <= 20);
}

#[test]
fn corrupt_state_file_raises_warning_until_saved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("home.bin");
    fs::write(&path, b"xx").unwrap();

    let mut rig = Rig::with_config(test_config(Some(path.clone())), dir);
    assert!(rig.logged("Home position could not be loaded"));
    assert_eq!(rig.snapshot().motor.encoder_home_position, 0);
    assert!(rig.step_until(10, |s| s.faults.contains_key(&114)));
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
    assert_eq!(rig.snapshot().faults[&114].severity, FaultSeverity::Warning);

    rig.to_web();
    match rig.gateway.submit(Command::Dispatch) {
        Err(GatewayError::Precondition(PreconditionError::FaultActive { code, .. })) => {
            assert_eq!(code, FaultCode::HomePersistence)
        }
        other => panic!("expected FaultActive, got {other:?}"),
    }

    rig.submit(Command::ResetEncoder);
    assert!(rig.step_until(20, |s| s.faults.is_empty()));
    assert!(rig.logged("Fault 114 cleared"));
    assert_eq!(HomePersistence::new(&path).load().unwrap(), Some(0));
    rig.submit(Command::Dispatch);
}

#[test]
fn failed_save_keeps_home_in_memory() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let mut rig = Rig::with_config(test_config(Some(blocker.join("home.bin"))), dir);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
    rig.to_web();
    let position = jog_and_settle(&mut rig);

    rig.submit(Command::ResetEncoder);
    assert!(rig.step_until(10, |s| s.faults.contains_key(&114)));
    assert_eq!(rig.snapshot().motor.encoder_home_position, position);
    assert_eq!(rig.state(), RideState::Idle);
}

#[test]
fn reset_rejected_while_running() {
    let mut rig = Rig::idle();
    rig.start_ride();
    assert!(matches!(
        rig.gateway.submit(Command::ResetEncoder),
        Err(GatewayError::Precondition(PreconditionError::NotIdle))
    ));
}

#[test]
fn no_state_file_keeps_home_in_memory() {
    let dir = TempDir::new().unwrap();
    let mut rig = Rig::with_config(test_config(None), dir);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
    rig.to_web();
    let position = jog_and_settle(&mut rig);
    rig.submit(Command::ResetEncoder);
    rig.step(20);
    assert_eq!(rig.snapshot().motor.encoder_home_position, position);
    assert!(rig.snapshot().faults.is_empty());
}
