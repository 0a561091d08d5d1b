//! Drive and servo physics.

use rcc_common::consts::NOMINAL_SUPPLY_VOLTAGE;
use rcc_common::ride::motor::{DockPosition, DockState};
use std::time::Duration;
use tracing::trace;

/// Time for the dock servo to travel end to end [s].
pub const DOCK_TRAVEL_SECS: f64 = 0.5;

/// Deceleration of an unpowered, braked drive [QPPS/s].
const BRAKE_DECEL: f64 = 3_000.0;
/// Current drawn by an energized drive at rest [A].
const IDLE_CURRENT: f64 = 0.3;
/// Current per QPPS of speed [A].
const CURRENT_PER_QPPS: f64 = 0.002;
/// Current per QPPS/s of acceleration [A].
const CURRENT_PER_ACCEL: f64 = 0.0005;
/// Supply droop per amp [V].
const SUPPLY_DROOP_PER_AMP: f64 = 0.05;

/// Velocity-controlled drive with encoder.
///
/// Speed slews toward the setpoint at the commanded acceleration, like a
/// speed-with-acceleration move on the motor controller.
#[derive(Debug, Clone)]
pub struct MotorSimulator {
    position: f64,
    speed: f64,
    accel_actual: f64,
    enabled: bool,
    setpoint: f64,
    accel: f64,
    stalled: bool,
}

impl MotorSimulator {
    /// Drive at rest at encoder position `position`.
    pub fn new(position: i64) -> Self {
        Self {
            position: position as f64,
            speed: 0.0,
            accel_actual: 0.0,
            enabled: false,
            setpoint: 0.0,
            accel: 0.0,
            stalled: false,
        }
    }

    /// Latch new setpoints.
    pub fn command(&mut self, enabled: bool, speed: i32, accel: u32) {
        self.enabled = enabled;
        self.setpoint = f64::from(speed);
        self.accel = f64::from(accel);
    }

    /// Mechanically block the drive (speed stays 0).
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Advance by `dt`.
    pub fn step(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        if dt <= 0.0 {
            return;
        }
        let previous = self.speed;

        if self.stalled {
            self.speed = 0.0;
        } else {
            let (target, rate) = if self.enabled {
                // An accel of 0 means "as fast as possible".
                let rate = if self.accel > 0.0 { self.accel } else { f64::MAX };
                (self.setpoint, rate)
            } else {
                (0.0, BRAKE_DECEL)
            };
            let max_delta = rate * dt;
            let delta = (target - self.speed).clamp(-max_delta, max_delta);
            self.speed += delta;
        }

        self.accel_actual = (self.speed - previous) / dt;
        self.position += self.speed * dt;
        trace!(
            "motor sim: pos={:.1} speed={:.1} setpoint={:.1}",
            self.position, self.speed, self.setpoint
        );
    }

    /// Encoder count [ticks].
    pub fn position(&self) -> i64 {
        self.position.round() as i64
    }

    /// Speed [QPPS].
    pub fn speed(&self) -> i32 {
        self.speed.round() as i32
    }

    /// Modelled motor current [A].
    pub fn current(&self) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        IDLE_CURRENT + CURRENT_PER_QPPS * self.speed.abs() + CURRENT_PER_ACCEL * self.accel_actual.abs()
    }

    /// Supply voltage with load droop [V].
    pub fn supply_voltage(&self) -> f64 {
        NOMINAL_SUPPLY_VOLTAGE - SUPPLY_DROOP_PER_AMP * self.current()
    }
}

/// Two-position dock servo with finite travel time.
#[derive(Debug, Clone)]
pub struct ServoSimulator {
    state: DockState,
    remaining: f64,
}

impl ServoSimulator {
    /// Servo resting at `position`.
    pub fn new(position: DockPosition) -> Self {
        Self {
            state: match position {
                DockPosition::Raised => DockState::Raised,
                DockPosition::Lowered => DockState::Lowered,
            },
            remaining: 0.0,
        }
    }

    /// Advance by `dt` toward `target`. A de-energized servo freezes mid-travel.
    pub fn step(&mut self, dt: Duration, enabled: bool, target: Option<DockPosition>) {
        if !enabled {
            if matches!(self.state, DockState::Raising | DockState::Lowering) {
                self.state = DockState::Unknown;
                self.remaining = 0.0;
            }
            return;
        }

        if let Some(target) = target {
            let travelling_to = match self.state {
                DockState::Raised | DockState::Raising => DockPosition::Raised,
                DockState::Lowered | DockState::Lowering => DockPosition::Lowered,
                DockState::Unknown => {
                    // Opposite of the target so the move below always starts.
                    match target {
                        DockPosition::Raised => DockPosition::Lowered,
                        DockPosition::Lowered => DockPosition::Raised,
                    }
                }
            };
            if travelling_to != target {
                self.state = match target {
                    DockPosition::Raised => DockState::Raising,
                    DockPosition::Lowered => DockState::Lowering,
                };
                self.remaining = DOCK_TRAVEL_SECS;
            }
        }

        if matches!(self.state, DockState::Raising | DockState::Lowering) {
            self.remaining -= dt.as_secs_f64();
            if self.remaining <= 0.0 {
                self.remaining = 0.0;
                self.state = match self.state {
                    DockState::Raising => DockState::Raised,
                    _ => DockState::Lowered,
                };
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> DockState {
        self.state
    }
}
