//! RCC Common Library
//!
//! Shared types, constants and configuration loading for the ride-control
//! computer workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Cycle timing and motor constants
//! - [`ride`] - Ride domain types: state, inputs, faults, motor, commands, snapshot
//! - [`hal`] - Ride I/O driver contract and exchange types
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod ride;
