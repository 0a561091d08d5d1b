//! Motor, encoder and actuator telemetry types.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{
    ACCEL_FAST_QPPS2, ACCEL_MEDIUM_QPPS2, ACCEL_SLOW_QPPS2, SPEED_FAST_QPPS, SPEED_MEDIUM_QPPS,
    SPEED_SLOW_QPPS,
};

bitflags! {
    /// Motor controller status word.
    ///
    /// Bit layout of the RoboClaw 32-bit error/warning register. Only motor
    /// channel 1 drives the ride; channel 2 bits are still reported.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ControllerStatus: u32 {
        const E_STOP                    = 0x0000_0001;
        const TEMPERATURE_ERROR         = 0x0000_0002;
        const TEMPERATURE2_ERROR        = 0x0000_0004;
        const MAIN_VOLTAGE_HIGH_ERROR   = 0x0000_0008;
        const LOGIC_VOLTAGE_HIGH_ERROR  = 0x0000_0010;
        const LOGIC_VOLTAGE_LOW_ERROR   = 0x0000_0020;
        const M1_DRIVER_FAULT           = 0x0000_0040;
        const M2_DRIVER_FAULT           = 0x0000_0080;
        const M1_SPEED_ERROR            = 0x0000_0100;
        const M2_SPEED_ERROR            = 0x0000_0200;
        const M1_POSITION_ERROR         = 0x0000_0400;
        const M2_POSITION_ERROR         = 0x0000_0800;
        const M1_CURRENT_ERROR          = 0x0000_1000;
        const M2_CURRENT_ERROR          = 0x0000_2000;
        const M1_OVER_CURRENT_WARNING   = 0x0001_0000;
        const M2_OVER_CURRENT_WARNING   = 0x0002_0000;
        const MAIN_VOLTAGE_HIGH_WARNING = 0x0004_0000;
        const MAIN_VOLTAGE_LOW_WARNING  = 0x0008_0000;
        const TEMPERATURE_WARNING       = 0x0010_0000;
        const TEMPERATURE2_WARNING      = 0x0020_0000;
        const S4_TRIGGERED              = 0x0040_0000;
        const S5_TRIGGERED              = 0x0080_0000;
        const SPEED_ERROR_LIMIT_WARNING = 0x0100_0000;
        const POS_ERROR_LIMIT_WARNING   = 0x0200_0000;
    }
}

impl ControllerStatus {
    /// Bits that mean the controller cannot be trusted to drive the ride.
    pub const ERRORS: Self = Self::from_bits_truncate(0x0000_3FFF);

    /// Bits that are advisory.
    pub const WARNINGS: Self = Self::from_bits_truncate(0x033F_0000);

    /// Any error bit set.
    #[inline]
    pub const fn is_failure(self) -> bool {
        self.intersects(Self::ERRORS)
    }

    /// Any warning bit set.
    #[inline]
    pub const fn is_warning(self) -> bool {
        self.intersects(Self::WARNINGS)
    }
}

/// Jog direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JogDirection {
    /// Positive encoder direction.
    Forward,
    /// Negative encoder direction.
    Backward,
}

impl JogDirection {
    /// `+1` forward, `-1` backward.
    #[inline]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Loading dock servo end position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DockPosition {
    /// Platform up, riders board.
    Raised,
    /// Platform dropped clear of the vehicle.
    Lowered,
}

/// Reported loading dock state, including travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DockState {
    /// At the raised end stop.
    Raised,
    /// At the lowered end stop.
    Lowered,
    /// Travelling up.
    Raising,
    /// Travelling down.
    Lowering,
    /// Servo de-energized or position not yet known.
    #[default]
    Unknown,
}

impl DockState {
    /// End position if the dock is resting at one.
    #[inline]
    pub const fn at_rest(self) -> Option<DockPosition> {
        match self {
            Self::Raised => Some(DockPosition::Raised),
            Self::Lowered => Some(DockPosition::Lowered),
            _ => None,
        }
    }
}

/// Named speed preset from the ride tuning sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedPreset {
    /// Creep speed.
    Slow,
    /// Cruise speed.
    Medium,
    /// Launch speed.
    Fast,
}

impl SpeedPreset {
    /// Speed magnitude [QPPS].
    pub const fn qpps(self) -> i32 {
        match self {
            Self::Slow => SPEED_SLOW_QPPS,
            Self::Medium => SPEED_MEDIUM_QPPS,
            Self::Fast => SPEED_FAST_QPPS,
        }
    }

    /// Matching acceleration [QPPS/s].
    pub const fn accel(self) -> u32 {
        match self {
            Self::Slow => ACCEL_SLOW_QPPS2,
            Self::Medium => ACCEL_MEDIUM_QPPS2,
            Self::Fast => ACCEL_FAST_QPPS2,
        }
    }
}

/// What the motor controller's control routine is currently pursuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MotorActivity {
    /// Outputs de-energized.
    #[default]
    Disabled,
    /// Energized at zero speed.
    Holding,
    /// Held-button jog.
    Jogging {
        /// Jog direction.
        direction: JogDirection,
    },
    /// Autonomous return to the home reference.
    Homing,
    /// Ride program phase `phase` (the final phase is the return home).
    RideProgram {
        /// Zero-based phase index.
        phase: u8,
    },
    /// Decelerating to zero.
    Stopping,
}

/// Motor and actuator telemetry, refreshed every cycle.
///
/// `encoder_home_position` is the only persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotorStatus {
    /// Raw encoder count [ticks].
    pub encoder_position: i64,
    /// Home reference [ticks].
    pub encoder_home_position: i64,
    /// Measured speed [QPPS].
    pub motor_speed: i32,
    /// Setpoint sent to the drive this cycle [QPPS].
    pub commanded_speed: i32,
    /// Motor current [A].
    pub motor_current: f64,
    /// Main supply voltage [V].
    pub power_supply_voltage: f64,
    /// Controller health word.
    pub motor_controller_status: ControllerStatus,
    /// Encoder signal present.
    pub encoder_ok: bool,
    /// Consecutive cycles without a fresh sample (0 = fresh).
    pub stale_cycles: u32,
    /// Drive and servo outputs armed.
    pub outputs_enabled: bool,
    /// Loading dock state.
    pub dock: DockState,
    /// Control routine activity.
    pub activity: MotorActivity,
    /// Ride program has finished all phases including the return home.
    pub program_complete: bool,
}

impl MotorStatus {
    /// Position relative to home [ticks].
    #[inline]
    pub fn relative_position(&self) -> i64 {
        self.encoder_position - self.encoder_home_position
    }

    /// Whether the last sample is fresh.
    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.stale_cycles == 0
    }
}
