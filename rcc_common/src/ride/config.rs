//! Ride-control configuration.
//!
//! One TOML file, every section optional. Numeric parameters are range
//! checked by [`RccConfig::validate`] after parsing.
//!
//! ```toml
//! [shared]
//! service_name = "rcc-coaster"
//!
//! [cycle]
//! cycle_time_us = 10000
//!
//! [faults]
//! raise_cycles = 3
//! clear_cycles = 10
//!
//! [[faults.rules]]
//! code = 107
//! raise_cycles = 1
//!
//! [[ride.phases]]
//! name = "launch"
//! direction = "FORWARD"
//! speed = "fast"
//! duration_ms = 4000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    COMMAND_QUEUE_CAPACITY_DEFAULT, DEFAULT_CYCLE_TIME_US, FAULT_CLEAR_CYCLES_DEFAULT,
    FAULT_RAISE_CYCLES_DEFAULT, MAX_CYCLE_TIME_US, MIN_CYCLE_TIME_US, STOP_DECEL_QPPS2,
};
use crate::ride::fault::FaultCode;
use crate::ride::motor::{DockPosition, JogDirection, SpeedPreset};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete RCC configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RccConfig {
    /// Logging and identity.
    pub shared: SharedConfig,
    /// Control loop timing.
    pub cycle: CycleConfig,
    /// State machine sequencing.
    pub sequence: SequenceConfig,
    /// Fault monitor thresholds and debounce.
    pub faults: FaultConfig,
    /// Motor controller tuning.
    pub motor: MotorConfig,
    /// Ride program.
    pub ride: RideProgramConfig,
    /// Driver selection and persistence.
    pub hal: HalConfig,
}

impl RccConfig {
    /// Validate every section.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` naming the first offending parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.cycle.validate().map_err(ConfigError::ValidationError)?;
        self.sequence.validate().map_err(ConfigError::ValidationError)?;
        self.faults.validate().map_err(ConfigError::ValidationError)?;
        self.motor.validate().map_err(ConfigError::ValidationError)?;
        self.ride.validate().map_err(ConfigError::ValidationError)?;
        Ok(())
    }

    /// Convert a duration in milliseconds into whole control cycles (at least 1).
    pub fn ms_to_cycles(&self, ms: u32) -> u32 {
        let us = u64::from(ms) * 1000;
        let cycles = us.div_ceil(u64::from(self.cycle.cycle_time_us.max(1)));
        u32::try_from(cycles).unwrap_or(u32::MAX).max(1)
    }

    /// Cycle time in seconds.
    pub fn dt_secs(&self) -> f64 {
        f64::from(self.cycle.cycle_time_us) / 1_000_000.0
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

/// Control loop timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    /// Cycle period [µs] (default: 10000).
    pub cycle_time_us: u32,
    /// Inbound command queue capacity (default: 64).
    pub command_queue_capacity: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: DEFAULT_CYCLE_TIME_US,
            command_queue_capacity: COMMAND_QUEUE_CAPACITY_DEFAULT,
        }
    }
}

impl CycleConfig {
    fn validate(&self) -> Result<(), String> {
        if !(MIN_CYCLE_TIME_US..=MAX_CYCLE_TIME_US).contains(&self.cycle_time_us) {
            return Err(format!(
                "cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, MIN_CYCLE_TIME_US, MAX_CYCLE_TIME_US
            ));
        }
        if self.command_queue_capacity == 0 {
            return Err("command_queue_capacity must be > 0".to_string());
        }
        Ok(())
    }
}

// ─── Sequence ───────────────────────────────────────────────────────

/// State machine sequencing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequenceConfig {
    /// Clean cycles required by the INIT self-test (default: 3).
    pub self_test_cycles: u32,
    /// Cycles without blocking faults before FAULT returns to IDLE (default: 1).
    pub fault_recovery_cycles: u32,
    /// Time DISPATCH_PENDING waits for pre-motion checks [ms] (default: 2000).
    pub dispatch_timeout_ms: u32,
    /// Dock position required to dispatch (default: lowered).
    pub dispatch_dock: DockPosition,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            self_test_cycles: 3,
            fault_recovery_cycles: 1,
            dispatch_timeout_ms: 2_000,
            dispatch_dock: DockPosition::Lowered,
        }
    }
}

impl SequenceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.self_test_cycles == 0 {
            return Err("self_test_cycles must be > 0".to_string());
        }
        if self.fault_recovery_cycles == 0 {
            return Err("fault_recovery_cycles must be > 0".to_string());
        }
        if self.dispatch_timeout_ms == 0 {
            return Err("dispatch_timeout_ms must be > 0".to_string());
        }
        Ok(())
    }
}

// ─── Faults ─────────────────────────────────────────────────────────

/// Fault monitor thresholds and debounce windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FaultConfig {
    /// Consecutive cycles a condition must hold before raise (N, default: 3).
    pub raise_cycles: u32,
    /// Consecutive absent cycles before clear (M, default: 10).
    pub clear_cycles: u32,
    /// Motor current limit [A] (default: 8.0).
    pub motor_current_limit: f64,
    /// Lower supply voltage bound [V] (default: 20.0).
    pub supply_voltage_min: f64,
    /// Upper supply voltage bound [V] (default: 30.0).
    pub supply_voltage_max: f64,
    /// Allowed |measured − commanded| speed [QPPS] (default: 150).
    pub speed_deviation_limit: i32,
    /// Web link silence tolerated under WEB authority [ms] (default: 3000).
    pub web_link_timeout_ms: u32,
    /// Longest allowed RUNNING period [ms] (default: 120000).
    pub max_ride_duration_ms: u32,
    /// Time allowed between program start and confirmed motion [ms] (default: 2000).
    pub motion_start_timeout_ms: u32,
    /// Per-rule overrides.
    pub rules: Vec<FaultRuleOverride>,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            raise_cycles: FAULT_RAISE_CYCLES_DEFAULT,
            clear_cycles: FAULT_CLEAR_CYCLES_DEFAULT,
            motor_current_limit: 8.0,
            supply_voltage_min: 20.0,
            supply_voltage_max: 30.0,
            speed_deviation_limit: 150,
            web_link_timeout_ms: 3_000,
            max_ride_duration_ms: 120_000,
            motion_start_timeout_ms: 2_000,
            rules: Vec::new(),
        }
    }
}

impl FaultConfig {
    /// Override entry for `code`, if any.
    pub fn rule(&self, code: FaultCode) -> Option<&FaultRuleOverride> {
        self.rules.iter().find(|r| r.code == code.as_u16())
    }

    fn validate(&self) -> Result<(), String> {
        if self.raise_cycles == 0 || self.clear_cycles == 0 {
            return Err("raise_cycles and clear_cycles must be > 0".to_string());
        }
        if self.motor_current_limit <= 0.0 {
            return Err(format!(
                "motor_current_limit {} must be > 0",
                self.motor_current_limit
            ));
        }
        if self.supply_voltage_min >= self.supply_voltage_max {
            return Err(format!(
                "supply voltage band [{}, {}] is empty",
                self.supply_voltage_min, self.supply_voltage_max
            ));
        }
        if self.speed_deviation_limit <= 0 {
            return Err("speed_deviation_limit must be > 0".to_string());
        }
        for rule in &self.rules {
            let Some(code) = FaultCode::from_u16(rule.code) else {
                return Err(format!("unknown fault code {} in [[faults.rules]]", rule.code));
            };
            if code == FaultCode::InternalError && rule.enabled == Some(false) {
                return Err("fault 115 (internal error) cannot be disabled".to_string());
            }
            if rule.raise_cycles == Some(0) || rule.clear_cycles == Some(0) {
                return Err(format!("fault {} debounce windows must be > 0", rule.code));
            }
            if self.rules.iter().filter(|r| r.code == rule.code).count() > 1 {
                return Err(format!("duplicate [[faults.rules]] entry for {}", rule.code));
            }
        }
        Ok(())
    }
}

/// Per-rule tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaultRuleOverride {
    /// Numeric fault code.
    pub code: u16,
    /// Evaluate this rule (default: true).
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Raise window override [cycles].
    #[serde(default)]
    pub raise_cycles: Option<u32>,
    /// Clear window override [cycles].
    #[serde(default)]
    pub clear_cycles: Option<u32>,
}

// ─── Motor ──────────────────────────────────────────────────────────

/// Motor controller tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotorConfig {
    /// Jog speed preset (default: slow).
    pub jog_speed: SpeedPreset,
    /// Jog stops when not re-issued within this window [ms] (default: 250).
    pub jog_watchdog_ms: u32,
    /// Controlled stop deceleration [QPPS/s] (default: 500).
    pub stop_decel: u32,
    /// |speed| at or below this is "stopped" [QPPS] (default: 5).
    pub zero_speed_threshold: i32,
    /// |speed| at or above this confirms motion start [QPPS] (default: 20).
    pub motion_confirm_speed: i32,
    /// Home approach maximum speed [QPPS] (default: 1000).
    pub home_speed: i32,
    /// Home approach proportional gain [QPPS per tick] (default: 2.0).
    pub home_gain: f64,
    /// Home reached within this many ticks (default: 10).
    pub home_tolerance: i64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            jog_speed: SpeedPreset::Slow,
            jog_watchdog_ms: 250,
            stop_decel: STOP_DECEL_QPPS2,
            zero_speed_threshold: 5,
            motion_confirm_speed: 20,
            home_speed: 1_000,
            home_gain: 2.0,
            home_tolerance: 10,
        }
    }
}

impl MotorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.jog_watchdog_ms == 0 {
            return Err("jog_watchdog_ms must be > 0".to_string());
        }
        if self.stop_decel == 0 {
            return Err("stop_decel must be > 0".to_string());
        }
        if self.zero_speed_threshold < 0 {
            return Err("zero_speed_threshold must be >= 0".to_string());
        }
        if self.motion_confirm_speed <= self.zero_speed_threshold {
            return Err(format!(
                "motion_confirm_speed {} must exceed zero_speed_threshold {}",
                self.motion_confirm_speed, self.zero_speed_threshold
            ));
        }
        if self.home_speed <= 0 || self.home_gain <= 0.0 || self.home_tolerance < 0 {
            return Err("home_speed, home_gain must be > 0 and home_tolerance >= 0".to_string());
        }
        Ok(())
    }
}

// ─── Ride Program ───────────────────────────────────────────────────

/// Ride program: timed phases followed by a return home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RideProgramConfig {
    /// Ordered phases.
    pub phases: Vec<RidePhase>,
    /// Finish with an approach to the home reference (default: true).
    pub return_home: bool,
}

impl Default for RideProgramConfig {
    fn default() -> Self {
        Self {
            phases: vec![
                RidePhase {
                    name: "launch".to_string(),
                    direction: JogDirection::Forward,
                    speed: SpeedPreset::Fast,
                    accel: None,
                    duration_ms: 4_000,
                },
                RidePhase {
                    name: "cruise".to_string(),
                    direction: JogDirection::Forward,
                    speed: SpeedPreset::Medium,
                    accel: None,
                    duration_ms: 6_000,
                },
                RidePhase {
                    name: "reverse".to_string(),
                    direction: JogDirection::Backward,
                    speed: SpeedPreset::Medium,
                    accel: None,
                    duration_ms: 6_000,
                },
            ],
            return_home: true,
        }
    }
}

impl RideProgramConfig {
    fn validate(&self) -> Result<(), String> {
        if self.phases.is_empty() && !self.return_home {
            return Err("ride program has no phases and no return home".to_string());
        }
        if self.phases.len() > usize::from(u8::MAX) {
            return Err(format!("too many ride phases ({})", self.phases.len()));
        }
        for phase in &self.phases {
            if phase.duration_ms == 0 {
                return Err(format!("ride phase '{}' has zero duration", phase.name));
            }
        }
        Ok(())
    }
}

/// One timed ride phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RidePhase {
    /// Label for logs.
    pub name: String,
    /// Travel direction.
    pub direction: JogDirection,
    /// Target speed preset.
    pub speed: SpeedPreset,
    /// Acceleration preset (default: same as `speed`).
    #[serde(default)]
    pub accel: Option<SpeedPreset>,
    /// Phase length [ms].
    pub duration_ms: u32,
}

impl RidePhase {
    /// Signed target speed [QPPS].
    pub fn target_qpps(&self) -> i32 {
        self.speed.qpps() * self.direction.sign()
    }

    /// Acceleration [QPPS/s].
    pub fn accel_qpps2(&self) -> u32 {
        self.accel.unwrap_or(self.speed).accel()
    }
}

// ─── HAL ────────────────────────────────────────────────────────────

/// Driver selection and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HalConfig {
    /// Registered driver name (default: "simulation").
    pub driver: String,
    /// Home position state file. `None` keeps the home in memory only.
    pub state_file: Option<PathBuf>,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            driver: "simulation".to_string(),
            state_file: Some(PathBuf::from("/var/lib/rcc/home_position.bin")),
        }
    }
}
