//! Fault rule predicates.
//!
//! One rule per [`FaultCode`]. A predicate answers `Some(true)` when its
//! condition holds this cycle, `Some(false)` when it is absent, and `None`
//! when the cycle carries no evidence either way (telemetry-based rules on a
//! stale sample). `None` freezes the rule's debounce counters.

use rcc_common::ride::config::{FaultConfig, RccConfig};
use rcc_common::ride::fault::FaultCode;
use rcc_common::ride::input::EffectiveInputs;
use rcc_common::ride::motor::{MotorActivity, MotorStatus};
use rcc_common::ride::state::{ControlAuthority, RideState};

/// Number of rules, one per fault code.
pub const RULE_COUNT: usize = FaultCode::ALL.len();

/// Everything the rules look at in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaultTelemetry {
    /// Cycle being evaluated.
    pub cycle: u64,
    /// Latest motor status.
    pub motor: MotorStatus,
    /// Effective inputs this cycle.
    pub inputs: EffectiveInputs,
    /// Authority mode.
    pub authority: ControlAuthority,
    /// Ride state at the start of the cycle.
    pub state: RideState,
    /// Cycles since the last web heartbeat or command.
    pub web_silent_cycles: u64,
    /// Cycles spent in RUNNING so far.
    pub running_cycles: u32,
    /// Cycles since the ride program started without confirmed motion.
    pub motion_wait_cycles: u32,
    /// The previous cycle failed internally.
    pub internal_error: bool,
    /// Last home load/save failed.
    pub persistence_failed: bool,
}

/// Rule thresholds, converted to cycles where time-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleThresholds {
    /// [A]
    pub motor_current_limit: f64,
    /// [V]
    pub supply_voltage_min: f64,
    /// [V]
    pub supply_voltage_max: f64,
    /// [QPPS]
    pub speed_deviation_limit: i32,
    /// [cycles]
    pub web_link_timeout_cycles: u64,
    /// [cycles]
    pub max_ride_cycles: u32,
    /// [cycles]
    pub motion_start_timeout_cycles: u32,
    /// [QPPS]
    pub zero_speed_threshold: i32,
}

impl RuleThresholds {
    /// Derive from the loaded config.
    pub fn from_config(config: &RccConfig) -> Self {
        let faults = &config.faults;
        Self {
            motor_current_limit: faults.motor_current_limit,
            supply_voltage_min: faults.supply_voltage_min,
            supply_voltage_max: faults.supply_voltage_max,
            speed_deviation_limit: faults.speed_deviation_limit,
            web_link_timeout_cycles: u64::from(config.ms_to_cycles(faults.web_link_timeout_ms)),
            max_ride_cycles: config.ms_to_cycles(faults.max_ride_duration_ms),
            motion_start_timeout_cycles: config.ms_to_cycles(faults.motion_start_timeout_ms),
            zero_speed_threshold: config.motor.zero_speed_threshold,
        }
    }
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self::from_config(&RccConfig::default())
    }
}

/// One configured rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRule {
    /// Fault raised by this rule.
    pub code: FaultCode,
    /// Disabled rules never raise.
    pub enabled: bool,
    /// Consecutive present cycles before raise.
    pub raise_cycles: u32,
    /// Consecutive absent cycles before clear.
    pub clear_cycles: u32,
}

impl FaultRule {
    /// Rule for `code` with global windows and any per-code override applied.
    pub fn from_config(code: FaultCode, faults: &FaultConfig) -> Self {
        // A cycle failure must stop the ride on the first occurrence.
        let default_raise = match code {
            FaultCode::InternalError => 1,
            _ => faults.raise_cycles,
        };
        let over = faults.rule(code);
        Self {
            code,
            enabled: over.and_then(|r| r.enabled).unwrap_or(true),
            raise_cycles: over.and_then(|r| r.raise_cycles).unwrap_or(default_raise),
            clear_cycles: over
                .and_then(|r| r.clear_cycles)
                .unwrap_or(faults.clear_cycles),
        }
    }

    /// Full rule table in [`FaultCode::ALL`] order.
    pub fn table(faults: &FaultConfig) -> [Self; RULE_COUNT] {
        FaultCode::ALL.map(|code| Self::from_config(code, faults))
    }

    /// Evaluate this rule's predicate.
    #[inline]
    pub fn condition(&self, t: &FaultTelemetry, th: &RuleThresholds) -> Option<bool> {
        condition(self.code, t, th)
    }
}

/// Predicate for `code`.
pub fn condition(code: FaultCode, t: &FaultTelemetry, th: &RuleThresholds) -> Option<bool> {
    let m = &t.motor;
    let fresh = m.is_fresh();
    match code {
        FaultCode::PowerFailure => fresh.then(|| {
            !(th.supply_voltage_min..=th.supply_voltage_max).contains(&m.power_supply_voltage)
        }),
        FaultCode::MotorControllerFailure => fresh.then(|| m.motor_controller_status.is_failure()),
        FaultCode::EncoderSignalLoss => fresh.then_some(!m.encoder_ok),
        FaultCode::ControllerWarning => fresh.then(|| m.motor_controller_status.is_warning()),
        FaultCode::MotorOvercurrent => fresh.then_some(m.motor_current > th.motor_current_limit),
        FaultCode::SpeedDeviation => fresh.then(|| {
            let tracking = matches!(
                m.activity,
                MotorActivity::RideProgram { .. }
                    | MotorActivity::Jogging { .. }
                    | MotorActivity::Homing
            );
            tracking
                && (i64::from(m.motor_speed) - i64::from(m.commanded_speed)).abs()
                    > i64::from(th.speed_deviation_limit)
        }),
        FaultCode::CommunicationFailure => Some(
            t.authority == ControlAuthority::Web
                && t.web_silent_cycles > th.web_link_timeout_cycles
                && matches!(
                    t.state,
                    RideState::DispatchPending | RideState::Running | RideState::Maintenance
                ),
        ),
        FaultCode::MotionStartTimeout => {
            Some(t.motion_wait_cycles > th.motion_start_timeout_cycles)
        }
        FaultCode::InputConflict => Some(t.inputs.dispatch && t.inputs.stop),
        FaultCode::RideCycleTimeout => Some(t.running_cycles > th.max_ride_cycles),
        FaultCode::StaleTelemetry => Some(!fresh),
        FaultCode::HomePersistence => Some(t.persistence_failed),
        FaultCode::InternalError => Some(t.internal_error),
        FaultCode::OutputsDisabledInMotion => Some(
            !m.outputs_enabled
                && (t.state.is_ride_motion() || m.motor_speed.abs() > th.zero_speed_threshold),
        ),
    }
}
