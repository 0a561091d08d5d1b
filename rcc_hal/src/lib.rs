//! # RCC HAL Library
//!
//! Ride I/O backends behind the `RideIo` trait from
//! `rcc_common::hal::driver`, plus persistence of the encoder home reference.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//! - [`persistence`] - Home position state file
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  rcc_control_unit (loop)                  │
//! │       sample() ──►  HalStatus    HalCommands ──► write()  │
//! └───────────────────────────┬───────────────────────────────┘
//!                             │ Box<dyn RideIo>
//!                             ▼
//!                ┌─────────────────────────┐
//!                │  DriverRegistry         │
//!                │   "simulation" ──► SimulationDriver
//!                └─────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;
pub mod persistence;

pub use crate::driver_registry::DriverRegistry;
pub use crate::persistence::{HomePersistence, PersistedHome};
