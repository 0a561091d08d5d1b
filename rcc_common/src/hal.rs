//! Ride I/O driver contract.
//!
//! - [`driver`] - `RideIo` trait and `HalError`
//! - [`types`] - `HalCommands` / `HalStatus` exchanged every cycle

pub mod driver;
pub mod types;
