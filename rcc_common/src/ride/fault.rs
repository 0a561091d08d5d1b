//! Fault catalogue and fault records.
//!
//! Codes are stable numeric identifiers shown to operators and kept in the
//! audit trail. Each code has one fixed severity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fault severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum FaultSeverity {
    /// Reported, blocks dispatch, does not stop the ride.
    Warning = 0,
    /// Controlled stop, state FAULT, self-heals.
    Critical = 1,
    /// Immediate safe stop, state ESTOP, requires RESTART.
    EstopLevel = 2,
}

impl FaultSeverity {
    /// Upper-case wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::EstopLevel => "ESTOP_LEVEL",
        }
    }
}

impl fmt::Display for FaultSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable fault codes.
///
/// 110 (restraint lock) and 111 (sensor mismatch) are reserved for ride
/// hardware this unit does not read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum FaultCode {
    /// Supply voltage outside the configured band.
    PowerFailure = 102,
    /// Motor controller reports an error bit.
    MotorControllerFailure = 103,
    /// Encoder reports no signal.
    EncoderSignalLoss = 104,
    /// Web holds authority over a moving ride but has gone silent.
    CommunicationFailure = 105,
    /// Motor controller reports a warning bit.
    ControllerWarning = 106,
    /// Motor current above limit.
    MotorOvercurrent = 107,
    /// Measured speed departs from the commanded profile.
    SpeedDeviation = 108,
    /// Ride program started but no motion was confirmed.
    MotionStartTimeout = 109,
    /// Ride ran longer than the configured maximum.
    RideCycleTimeout = 112,
    /// Driver sample timed out or failed.
    StaleTelemetry = 113,
    /// Home position could not be loaded or saved.
    HomePersistence = 114,
    /// A control cycle failed internally.
    InternalError = 115,
    /// Actuator outputs were disabled while the ride was moving.
    OutputsDisabledInMotion = 116,
    /// DISPATCH and STOP asserted together.
    InputConflict = 117,
}

impl FaultCode {
    /// Every code, in numeric order.
    pub const ALL: [Self; 14] = [
        Self::PowerFailure,
        Self::MotorControllerFailure,
        Self::EncoderSignalLoss,
        Self::CommunicationFailure,
        Self::ControllerWarning,
        Self::MotorOvercurrent,
        Self::SpeedDeviation,
        Self::MotionStartTimeout,
        Self::RideCycleTimeout,
        Self::StaleTelemetry,
        Self::HomePersistence,
        Self::InternalError,
        Self::OutputsDisabledInMotion,
        Self::InputConflict,
    ];

    /// Numeric code.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Convert from numeric code. Returns `None` for unknown codes.
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            102 => Some(Self::PowerFailure),
            103 => Some(Self::MotorControllerFailure),
            104 => Some(Self::EncoderSignalLoss),
            105 => Some(Self::CommunicationFailure),
            106 => Some(Self::ControllerWarning),
            107 => Some(Self::MotorOvercurrent),
            108 => Some(Self::SpeedDeviation),
            109 => Some(Self::MotionStartTimeout),
            112 => Some(Self::RideCycleTimeout),
            113 => Some(Self::StaleTelemetry),
            114 => Some(Self::HomePersistence),
            115 => Some(Self::InternalError),
            116 => Some(Self::OutputsDisabledInMotion),
            117 => Some(Self::InputConflict),
            _ => None,
        }
    }

    /// Severity attached to this code.
    pub const fn severity(self) -> FaultSeverity {
        match self {
            Self::PowerFailure | Self::MotorControllerFailure | Self::InternalError => {
                FaultSeverity::EstopLevel
            }
            Self::ControllerWarning | Self::InputConflict | Self::HomePersistence => {
                FaultSeverity::Warning
            }
            Self::EncoderSignalLoss
            | Self::CommunicationFailure
            | Self::MotorOvercurrent
            | Self::SpeedDeviation
            | Self::MotionStartTimeout
            | Self::RideCycleTimeout
            | Self::StaleTelemetry
            | Self::OutputsDisabledInMotion => FaultSeverity::Critical,
        }
    }

    /// Operator-facing description.
    pub const fn message(self) -> &'static str {
        match self {
            Self::PowerFailure => "Power failure: supply voltage out of band",
            Self::MotorControllerFailure => "Motor controller failure",
            Self::EncoderSignalLoss => "Encoder signal lost",
            Self::CommunicationFailure => "Web control link lost while ride under web authority",
            Self::ControllerWarning => "Motor controller warning",
            Self::MotorOvercurrent => "Motor current over threshold",
            Self::SpeedDeviation => "Motor speed deviates from command",
            Self::MotionStartTimeout => "Ride did not start moving after dispatch",
            Self::InputConflict => "DISPATCH and STOP asserted simultaneously",
            Self::RideCycleTimeout => "Ride cycle exceeded maximum duration",
            Self::StaleTelemetry => "Motor telemetry stale",
            Self::HomePersistence => "Home position not persisted, running from memory",
            Self::InternalError => "Internal control error",
            Self::OutputsDisabledInMotion => "Actuator outputs disabled while ride in motion",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// A fault record. Active while `cleared_at` is `None`.
///
/// Timestamps are control-cycle counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Stable identifier.
    pub code: FaultCode,
    /// Human text.
    pub message: String,
    /// Severity.
    pub severity: FaultSeverity,
    /// Cycle the fault was raised.
    pub raised_at: u64,
    /// Cycle the fault was cleared.
    pub cleared_at: Option<u64>,
}

impl Fault {
    /// New active fault with the catalogue message and severity.
    pub fn raise(code: FaultCode, cycle: u64) -> Self {
        Self {
            code,
            message: code.message().to_string(),
            severity: code.severity(),
            raised_at: cycle,
            cleared_at: None,
        }
    }

    /// Whether the fault is still active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.cleared_at.is_none()
    }
}

/// Status-endpoint view of an active fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultView {
    /// Human text.
    pub message: String,
    /// Severity.
    pub severity: FaultSeverity,
    /// Cycle the fault was raised.
    pub raised_at: u64,
}

impl From<&Fault> for FaultView {
    fn from(fault: &Fault) -> Self {
        Self {
            message: fault.message.clone(),
            severity: fault.severity,
            raised_at: fault.raised_at,
        }
    }
}
