//! Ride I/O driver implementations.
//!
//! - [`simulation`] - Software ride model for development and testing

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register every built-in driver.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_driver);
}
