//! Shared rig for the integration tests.

mod authority;
mod dispatch;
mod fault_recovery;
mod maintenance;
mod persistence;

use std::path::PathBuf;
use std::sync::Arc;

use rcc_common::ride::command::Command;
use rcc_common::ride::config::{RccConfig, RidePhase};
use rcc_common::ride::input::InputFlags;
use rcc_common::ride::motor::{JogDirection, SpeedPreset};
use rcc_common::ride::snapshot::RideSnapshot;
use rcc_common::ride::state::{ControlAuthority, RideState};
use rcc_control_unit::cycle::CycleRunner;
use rcc_control_unit::gateway::Gateway;
use rcc_hal::drivers::simulation::{SimHandle, SimulationDriver};
use tempfile::TempDir;

/// Short two-phase ride; the web link timeout is long enough for any test
/// that does not exercise it.
pub fn test_config(state_file: Option<PathBuf>) -> RccConfig {
    let mut config = RccConfig::default();
    config.hal.state_file = state_file;
    config.faults.web_link_timeout_ms = 60_000;
    config.ride.phases = vec![
        RidePhase {
            name: "out".into(),
            direction: JogDirection::Forward,
            speed: SpeedPreset::Medium,
            accel: None,
            duration_ms: 500,
        },
        RidePhase {
            name: "back".into(),
            direction: JogDirection::Backward,
            speed: SpeedPreset::Medium,
            accel: None,
            duration_ms: 500,
        },
    ];
    config
}

/// Control loop + simulated ride + gateway.
pub struct Rig {
    pub runner: CycleRunner,
    pub gateway: Gateway,
    pub sim: SimHandle,
    pub dir: TempDir,
}

impl Rig {
    /// Rig with a state file in a fresh temp dir.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = test_config(Some(dir.path().join("home.bin")));
        Self::with_config(config, dir)
    }

    /// Rig with an explicit config.
    pub fn with_config(config: RccConfig, dir: TempDir) -> Self {
        let driver = SimulationDriver::new();
        let sim = driver.handle();
        let (runner, gateway) = CycleRunner::new(&config, Box::new(driver)).unwrap();
        Self {
            runner,
            gateway,
            sim,
            dir,
        }
    }

    /// Rig that has passed its self-test.
    pub fn idle() -> Self {
        let mut rig = Self::new();
        assert!(rig.step_until(10, |s| s.state == RideState::Idle));
        rig
    }

    /// Idle rig under WEB authority.
    pub fn idle_web() -> Self {
        let mut rig = Self::idle();
        rig.to_web();
        rig
    }

    /// Flip authority to WEB.
    pub fn to_web(&mut self) {
        if self.snapshot().authority != ControlAuthority::Web {
            self.submit(Command::ToggleWebControls);
            self.step(1);
        }
        assert_eq!(self.snapshot().authority, ControlAuthority::Web);
    }

    /// Run `cycles` cycles.
    pub fn step(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.runner.step();
        }
    }

    /// Step until `pred` holds on the published snapshot. False on timeout.
    pub fn step_until<F: Fn(&RideSnapshot) -> bool>(&mut self, max: u32, pred: F) -> bool {
        for _ in 0..max {
            self.runner.step();
            if pred(&self.snapshot()) {
                return true;
            }
        }
        false
    }

    /// Submit and require acceptance.
    pub fn submit(&self, command: Command) {
        self.gateway
            .submit(command)
            .unwrap_or_else(|e| panic!("{command} rejected: {e}"));
    }

    /// Hold a panel button for one cycle.
    pub fn tap(&mut self, input: InputFlags) {
        self.sim.press(input);
        self.step(1);
        self.sim.release(input);
    }

    pub fn snapshot(&self) -> Arc<RideSnapshot> {
        self.gateway.snapshot()
    }

    pub fn state(&self) -> RideState {
        self.runner.state()
    }

    /// WEB dispatch and wait for RUNNING.
    pub fn start_ride(&mut self) {
        self.to_web();
        self.submit(Command::Dispatch);
        assert!(
            self.step_until(20, |s| s.state == RideState::Running),
            "ride did not start"
        );
    }

    /// Whether the log tail contains an entry starting with `prefix`.
    pub fn logged(&self, prefix: &str) -> bool {
        self.gateway
            .log_tail(usize::MAX)
            .iter()
            .any(|e| e.message.starts_with(prefix))
    }
}
