//! Motion profiles: setpoint ramp, home approach, ride program sequencing.

use rcc_common::ride::config::RideProgramConfig;
use tracing::debug;

// ─── Speed Ramp ─────────────────────────────────────────────────────

/// Rate-limited speed setpoint.
///
/// The controller ramps its own setpoint with the same acceleration it sends
/// to the drive, so the commanded speed is what the drive should be doing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedRamp {
    value: f64,
}

impl SpeedRamp {
    /// Move toward `target` by at most `accel · dt`. Returns the new setpoint.
    pub fn step(&mut self, target: i32, accel: u32, dt: f64) -> i32 {
        let target = f64::from(target);
        let max_delta = if accel == 0 {
            f64::MAX
        } else {
            f64::from(accel) * dt
        };
        self.value += (target - self.value).clamp(-max_delta, max_delta);
        self.speed()
    }

    /// Jump to `speed`.
    #[inline]
    pub fn reset(&mut self, speed: i32) {
        self.value = f64::from(speed);
    }

    /// Current setpoint [QPPS].
    #[inline]
    pub fn speed(&self) -> i32 {
        self.value.round() as i32
    }
}

// ─── Home Approach ──────────────────────────────────────────────────

/// Proportional speed toward home, saturated at `max_speed`.
///
/// `error` is `home − position` in encoder ticks.
#[inline]
pub fn home_approach(error: i64, gain: f64, max_speed: i32) -> i32 {
    let limit = f64::from(max_speed.abs());
    (error as f64 * gain).clamp(-limit, limit).round() as i32
}

// ─── Ride Program ───────────────────────────────────────────────────

/// What the program wants this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStep {
    /// Drive a timed phase.
    Phase {
        /// Phase index.
        index: u8,
        /// Signed target speed [QPPS].
        target: i32,
        /// Acceleration [QPPS/s].
        accel: u32,
    },
    /// Approach the home reference.
    ReturnHome {
        /// Step index (one past the last phase).
        index: u8,
    },
    /// Program finished; hold zero speed.
    Done {
        /// Step index of the final step.
        index: u8,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct CompiledPhase {
    name: String,
    target: i32,
    accel: u32,
    cycles: u32,
}

/// Sequences the configured ride phases one cycle at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramRunner {
    phases: Vec<CompiledPhase>,
    return_home: bool,
    index: usize,
    elapsed: u32,
    done: bool,
}

impl ProgramRunner {
    /// Compile `program` for a cycle period of `cycle_time_us`.
    pub fn new(program: &RideProgramConfig, cycle_time_us: u32) -> Self {
        let period = u64::from(cycle_time_us.max(1));
        let phases = program
            .phases
            .iter()
            .map(|p| {
                let cycles = (u64::from(p.duration_ms) * 1000).div_ceil(period).max(1);
                CompiledPhase {
                    name: p.name.clone(),
                    target: p.target_qpps(),
                    accel: p.accel_qpps2(),
                    cycles: u32::try_from(cycles).unwrap_or(u32::MAX),
                }
            })
            .collect();
        Self {
            phases,
            return_home: program.return_home,
            index: 0,
            elapsed: 0,
            done: false,
        }
    }

    /// Rewind to the first phase.
    pub fn reset(&mut self) {
        self.index = 0;
        self.elapsed = 0;
        self.done = false;
    }

    /// Step for this cycle; advances phase time.
    pub fn advance(&mut self) -> ProgramStep {
        let index = u8::try_from(self.index).unwrap_or(u8::MAX);
        if self.done {
            return ProgramStep::Done { index };
        }
        if let Some(phase) = self.phases.get(self.index) {
            if self.elapsed == 0 {
                debug!("Ride phase '{}' started", phase.name);
            }
            let step = ProgramStep::Phase {
                index,
                target: phase.target,
                accel: phase.accel,
            };
            self.elapsed += 1;
            if self.elapsed >= phase.cycles {
                self.index += 1;
                self.elapsed = 0;
            }
            return step;
        }
        if self.return_home {
            ProgramStep::ReturnHome { index }
        } else {
            self.done = true;
            ProgramStep::Done { index }
        }
    }

    /// Mark the return-home step complete.
    pub fn finish(&mut self) {
        self.done = true;
    }

    /// Whether every step has completed.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of timed phases.
    #[inline]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }
}
