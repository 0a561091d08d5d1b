//! State machine module root.

pub mod machine;

pub use machine::{CycleDecision, MachineInputs, MachineParams, MaintenanceRequest, RideStateMachine, Transition};
