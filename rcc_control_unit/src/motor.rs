//! Motor/actuator controller root.
//!
//! The controller owns [`MotorStatus`](rcc_common::ride::motor::MotorStatus)
//! and the persisted home reference. Operator commands only set targets; the
//! per-cycle `control` routine turns the state machine's
//! [`MotorCommand`](rcc_common::ride::command::MotorCommand) and those targets
//! into driver setpoints.

pub mod controller;
pub mod profile;

pub use controller::{MotorController, MotorParams};
