//! Ride-control domain types.
//!
//! Shared between the control loop (single writer) and gateway readers.
//! Everything here is plain data: owned, `Clone`, serializable.

pub mod command;
pub mod config;
pub mod error;
pub mod fault;
pub mod input;
pub mod motor;
pub mod snapshot;
pub mod state;
