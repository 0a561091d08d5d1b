//! Integration test: fault detection, escalation and self-healing.
//!
//! Verifies:
//! 1. CRITICAL faults → FAULT with a controlled stop
//! 2. FAULT → IDLE once faults clear and the drive is stopped
//! 3. WARNING faults leave the state alone but block dispatch
//! 4. Stale telemetry, link loss, stalls and cycle failures escalate

use rcc_common::ride::command::{Command, MotorCommand};
use rcc_common::ride::config::FaultRuleOverride;
use rcc_common::ride::error::PreconditionError;
use rcc_common::ride::fault::{FaultCode, FaultSeverity};
use rcc_common::ride::input::InputFlags;
use rcc_common::ride::motor::ControllerStatus;
use rcc_common::ride::state::RideState;
use rcc_control_unit::gateway::GatewayError;
use tempfile::TempDir;

use super::{Rig, test_config};

#[test]
fn overcurrent_while_running_faults_and_self_heals() {
    let mut rig = Rig::idle();
    rig.start_ride();
    rig.step(10);

    rig.sim.update(|inj| inj.extra_current = 12.0);
    assert!(rig.step_until(5, |s| s.state == RideState::Fault));
    let snap = rig.snapshot();
    assert_eq!(snap.faults[&107].severity, FaultSeverity::Critical);
    assert_eq!(snap.motor_command, MotorCommand::ControlledStop);
    assert!(rig.logged("Fault 107 raised"));
    assert!(rig.logged("RUNNING → FAULT: CRITICAL fault active"));

    rig.sim.clear_faults();
    assert!(rig.step_until(300, |s| s.state == RideState::Idle));
    assert!(rig.logged("Fault 107 cleared"));
    assert!(rig.logged("FAULT → IDLE: faults cleared"));
    assert!(rig.snapshot().motor.motor_speed.abs() <= 5);
}

#[test]
fn fault_holds_while_condition_present() {
    let mut rig = Rig::idle();
    rig.sim.update(|inj| inj.extra_current = 12.0);
    assert!(rig.step_until(5, |s| s.state == RideState::Fault));

    rig.step(200);
    assert_eq!(rig.state(), RideState::Fault);

    // RESTART cannot acknowledge a fault whose condition still holds.
    rig.tap(InputFlags::RESTART);
    assert_eq!(rig.state(), RideState::Fault);
    assert!(rig.snapshot().faults.contains_key(&107));
}

#[test]
fn restart_acknowledges_resolved_fault() {
    let mut rig = Rig::idle();
    rig.sim.update(|inj| inj.extra_current = 12.0);
    assert!(rig.step_until(5, |s| s.state == RideState::Fault));

    rig.sim.clear_faults();
    rig.step(2);
    assert!(rig.snapshot().faults.contains_key(&107));

    rig.tap(InputFlags::RESTART);
    assert_eq!(rig.state(), RideState::Idle);
    assert!(rig.snapshot().faults.is_empty());
    assert!(rig.logged("Fault 107 acknowledged"));
}

#[test]
fn warning_does_not_change_state_but_blocks_dispatch() {
    let mut rig = Rig::idle_web();
    rig.sim
        .update(|inj| inj.controller_bits = ControllerStatus::TEMPERATURE_WARNING);
    assert!(rig.step_until(5, |s| s.faults.contains_key(&106)));
    assert_eq!(rig.state(), RideState::Idle);
    assert_eq!(rig.snapshot().faults[&106].severity, FaultSeverity::Warning);

    match rig.gateway.submit(Command::Dispatch) {
        Err(GatewayError::Precondition(PreconditionError::FaultActive { code, .. })) => {
            assert_eq!(code, FaultCode::ControllerWarning)
        }
        other => panic!("expected FaultActive, got {other:?}"),
    }

    // Physical dispatch is blocked by the state machine too.
    rig.submit(Command::ToggleWebControls);
    rig.step(1);
    rig.tap(InputFlags::DISPATCH);
    assert_eq!(rig.state(), RideState::Idle);
}

#[test]
fn controller_failure_is_estop_level() {
    let mut rig = Rig::idle();
    rig.sim
        .update(|inj| inj.controller_bits = ControllerStatus::M1_DRIVER_FAULT);
    assert!(rig.step_until(5, |s| s.state == RideState::Estop));
    assert_eq!(rig.snapshot().faults[&103].severity, FaultSeverity::EstopLevel);
}

#[test]
fn stale_telemetry_faults_and_freezes_telemetry_rules() {
    let mut rig = Rig::idle();
    rig.sim.update(|inj| {
        inj.sample_timeout = true;
        inj.extra_current = 12.0;
    });
    assert!(rig.step_until(5, |s| s.state == RideState::Fault));
    let snap = rig.snapshot();
    assert!(snap.faults.contains_key(&113));
    assert!(!snap.faults.contains_key(&107));
    assert!(snap.motor.stale_cycles >= 3);
    assert!(rig.logged("motor telemetry stale for 1 cycle(s)"));

    rig.sim.clear_faults();
    assert!(rig.step_until(50, |s| s.state == RideState::Idle));
    assert!(rig.snapshot().motor.is_fresh());
}

#[test]
fn encoder_loss_while_running() {
    let mut rig = Rig::idle();
    rig.start_ride();
    rig.sim.update(|inj| inj.encoder_lost = true);
    assert!(rig.step_until(5, |s| s.state == RideState::Fault));
    assert!(rig.snapshot().faults.contains_key(&104));
}

#[test]
fn outputs_disabled_in_motion() {
    let mut rig = Rig::idle();
    rig.start_ride();
    rig.step(20);

    rig.submit(Command::DisableServos);
    assert!(rig.step_until(5, |s| s.state == RideState::Fault));
    assert!(rig.snapshot().faults.contains_key(&116));
    assert!(!rig.snapshot().motor.outputs_enabled);
    assert!(rig.logged("Actuator outputs disabled"));

    // Coasted to a stop outside ride motion: the condition is gone.
    assert!(rig.step_until(200, |s| s.state == RideState::Idle));
}

#[test]
fn stalled_drive_trips_speed_deviation() {
    let mut rig = Rig::idle();
    rig.sim.update(|inj| inj.stalled = true);
    rig.to_web();
    rig.submit(Command::Dispatch);
    assert!(rig.step_until(50, |s| s.state == RideState::Fault));
    assert!(rig.snapshot().faults.contains_key(&108));
    assert!(rig.logged("DISPATCH_PENDING → FAULT"));
}

#[test]
fn stalled_drive_trips_motion_start_timeout() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(None);
    config.faults.motion_start_timeout_ms = 300;
    config.faults.rules = vec![FaultRuleOverride {
        code: 108,
        enabled: Some(false),
        raise_cycles: None,
        clear_cycles: None,
    }];
    let mut rig = Rig::with_config(config, dir);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));

    rig.sim.update(|inj| inj.stalled = true);
    rig.to_web();
    rig.submit(Command::Dispatch);
    rig.step(20);
    assert_eq!(rig.state(), RideState::DispatchPending);
    assert!(rig.step_until(50, |s| s.state == RideState::Fault));
    assert!(rig.snapshot().faults.contains_key(&109));
    assert!(!rig.snapshot().faults.contains_key(&108));
}

#[test]
fn web_link_loss_in_maintenance() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(None);
    config.faults.web_link_timeout_ms = 200;
    let mut rig = Rig::with_config(config, dir);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
    rig.to_web();
    rig.submit(Command::MaintenanceEnter);
    rig.step(1);
    assert_eq!(rig.state(), RideState::Maintenance);

    assert!(rig.step_until(40, |s| s.state == RideState::Fault));
    assert_eq!(rig.snapshot().faults[&105].severity, FaultSeverity::Critical);

    // Outside the link-supervised states the condition lapses.
    assert!(rig.step_until(50, |s| s.state == RideState::Idle));
}

#[test]
fn heartbeat_keeps_web_link_alive() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(None);
    config.faults.web_link_timeout_ms = 200;
    let mut rig = Rig::with_config(config, dir);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
    rig.to_web();
    rig.submit(Command::MaintenanceEnter);

    for _ in 0..20 {
        rig.step(10);
        rig.submit(Command::Heartbeat);
    }
    assert_eq!(rig.state(), RideState::Maintenance);
    assert!(rig.snapshot().faults.is_empty());
}

#[test]
fn link_silence_ignored_under_physical_authority() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(None);
    config.faults.web_link_timeout_ms = 200;
    let mut rig = Rig::with_config(config, dir);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
    rig.tap(InputFlags::DISPATCH);
    assert!(rig.step_until(20, |s| s.state == RideState::Running));
    rig.step(100);
    assert!(!rig.snapshot().faults.contains_key(&105));
}

#[test]
fn driver_panic_escalates_to_estop() {
    let mut rig = Rig::idle();
    rig.sim.update(|inj| inj.panic_on_sample = true);
    rig.step(1);
    assert!(rig.runner.last_error().is_some());
    assert!(rig.logged("Cycle failed, outputs forced safe (115)"));

    rig.step(1);
    assert_eq!(rig.state(), RideState::Estop);
    assert_eq!(rig.snapshot().faults[&115].severity, FaultSeverity::EstopLevel);

    rig.tap(InputFlags::RESTART);
    assert_eq!(rig.state(), RideState::Init);
    assert!(rig.step_until(10, |s| s.state == RideState::Idle));
}
