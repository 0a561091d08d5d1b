//! Simulation driver module.
//!
//! Software model of the ride: a velocity-controlled drive with quadrature
//! encoder, a two-position dock servo and the operator panel. A
//! [`SimHandle`] lets tests and tools press panel buttons and inject faults
//! while the control loop owns the driver.

mod driver;
mod handle;
mod physics;

pub use driver::SimulationDriver;
pub use handle::{SimHandle, SimInjection};
pub use physics::{DOCK_TRAVEL_SECS, MotorSimulator, ServoSimulator};

use rcc_common::hal::driver::RideIo;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn RideIo> {
    Box::new(SimulationDriver::new())
}
