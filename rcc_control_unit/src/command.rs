//! Command processing root.
//!
//! Precondition gating shared by the gateway (checked against the last
//! snapshot) and the cycle runner (re-checked against live state).

pub mod gate;
