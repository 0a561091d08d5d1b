//! # RCC Control Unit
//!
//! Deterministic ride-control loop. One thread owns every piece of mutable
//! ride state; the outside world talks to it through the [`gateway`].
//!
//! Each cycle:
//!
//! ```text
//!  gateway queue ──► apply commands
//!  driver.sample() ──► InputRegistry ──► effective inputs
//!                  └─► MotorController::ingest ──► MotorStatus
//!  FaultMonitor::evaluate + commit ──► active faults
//!  RideStateMachine::handle_cycle ──► RideState + MotorCommand
//!  MotorController::control ──► driver.write()
//!  publish RideSnapshot ──► gateway readers
//! ```
//!
//! # Modules
//!
//! - [`audit`] - Operator log tail
//! - [`authority`] - Control authority arbiter
//! - [`command`] - Command precondition gating
//! - [`config`] - Config file loading
//! - [`cycle`] - Cycle runner, timing, RT setup
//! - [`fault`] - Fault rules, debounce, active-fault set
//! - [`gateway`] - Command queue and snapshot access for the HMI boundary
//! - [`input`] - Input registry
//! - [`motor`] - Motor/actuator controller and motion profiles
//! - [`state`] - Ride state machine

pub mod audit;
pub mod authority;
pub mod command;
pub mod config;
pub mod cycle;
pub mod fault;
pub mod gateway;
pub mod input;
pub mod motor;
pub mod state;
