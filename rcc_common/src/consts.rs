//! System-wide constants.

use static_assertions::const_assert;

/// Default control cycle time in microseconds (10 ms).
pub const DEFAULT_CYCLE_TIME_US: u32 = 10_000;

/// Lower bound accepted for `cycle_time_us`.
pub const MIN_CYCLE_TIME_US: u32 = 1_000;

/// Upper bound accepted for `cycle_time_us`.
pub const MAX_CYCLE_TIME_US: u32 = 100_000;

/// Default number of consecutive cycles a fault condition must hold before raise.
pub const FAULT_RAISE_CYCLES_DEFAULT: u32 = 3;

/// Default number of consecutive absent cycles before a fault clears.
pub const FAULT_CLEAR_CYCLES_DEFAULT: u32 = 10;

/// Capacity of the gateway log tail ring.
pub const LOG_TAIL_CAPACITY: usize = 256;

/// Maximum bytes kept per log tail entry.
pub const LOG_MESSAGE_LEN: usize = 120;

/// Default capacity of the inbound command queue.
pub const COMMAND_QUEUE_CAPACITY_DEFAULT: usize = 64;

// ─── Motor ──────────────────────────────────────────────────────────

/// Encoder pulses per output-shaft revolution.
pub const ENCODER_PPR: f64 = 1425.1;

/// Quadrature counts per output-shaft revolution.
pub const ENCODER_COUNTS_PER_REV: f64 = ENCODER_PPR * 4.0;

/// Slow speed preset [QPPS]. Also the default jog speed.
pub const SPEED_SLOW_QPPS: i32 = 570;

/// Medium speed preset [QPPS].
pub const SPEED_MEDIUM_QPPS: i32 = 814;

/// Fast speed preset [QPPS].
pub const SPEED_FAST_QPPS: i32 = 1425;

/// Slow acceleration preset [QPPS/s].
pub const ACCEL_SLOW_QPPS2: u32 = 500;

/// Medium acceleration preset [QPPS/s].
pub const ACCEL_MEDIUM_QPPS2: u32 = 1000;

/// Fast acceleration preset [QPPS/s].
pub const ACCEL_FAST_QPPS2: u32 = 3000;

/// Controlled-stop deceleration [QPPS/s].
pub const STOP_DECEL_QPPS2: u32 = 500;

/// Nominal motor supply voltage [V].
pub const NOMINAL_SUPPLY_VOLTAGE: f64 = 24.0;

const_assert!(LOG_TAIL_CAPACITY.is_power_of_two());
const_assert!(FAULT_RAISE_CYCLES_DEFAULT <= FAULT_CLEAR_CYCLES_DEFAULT);
const_assert!(MIN_CYCLE_TIME_US <= DEFAULT_CYCLE_TIME_US);
const_assert!(DEFAULT_CYCLE_TIME_US <= MAX_CYCLE_TIME_US);
