//! Fault monitor root.
//!
//! Rule predicates over live telemetry, per-rule debounce, and the owned
//! active-fault set.

pub mod monitor;
pub mod rules;

pub use monitor::{FaultChanges, FaultEvaluation, FaultMonitor};
pub use rules::{FaultRule, FaultTelemetry, RULE_COUNT, RuleThresholds};
