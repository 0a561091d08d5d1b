//! Fault monitor: debounce and the active-fault set.
//!
//! [`FaultMonitor::evaluate`] is side-effect free and returns a
//! [`FaultEvaluation`] diff; [`FaultMonitor::commit`] applies it. The cycle
//! runner is the only caller of `commit`, which makes it the only writer of
//! the active set.

use std::collections::BTreeMap;

use rcc_common::ride::config::RccConfig;
use rcc_common::ride::fault::{Fault, FaultCode, FaultView};

use super::rules::{FaultRule, FaultTelemetry, RULE_COUNT, RuleThresholds};

/// Consecutive present/absent counts for one rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Debounce {
    present: u32,
    absent: u32,
}

/// Result of one evaluation, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultEvaluation {
    /// Evaluated cycle.
    pub cycle: u64,
    /// Faults whose raise window completed this cycle.
    pub raised: Vec<Fault>,
    /// Active codes whose clear window completed this cycle.
    pub cleared: Vec<FaultCode>,
    debounce: [Debounce; RULE_COUNT],
}

impl FaultEvaluation {
    /// Whether the diff changes the active set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raised.is_empty() && self.cleared.is_empty()
    }
}

/// Changes applied by [`FaultMonitor::commit`], for the audit trail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultChanges {
    /// Newly active faults.
    pub raised: Vec<Fault>,
    /// Cleared faults with `cleared_at` set.
    pub cleared: Vec<Fault>,
}

/// Rule table, debounce state and active faults.
#[derive(Debug, Clone)]
pub struct FaultMonitor {
    rules: [FaultRule; RULE_COUNT],
    thresholds: RuleThresholds,
    debounce: [Debounce; RULE_COUNT],
    active: BTreeMap<FaultCode, Fault>,
}

impl FaultMonitor {
    /// Build the rule table from config. No faults active.
    pub fn new(config: &RccConfig) -> Self {
        Self {
            rules: FaultRule::table(&config.faults),
            thresholds: RuleThresholds::from_config(config),
            debounce: [Debounce::default(); RULE_COUNT],
            active: BTreeMap::new(),
        }
    }

    /// Run every enabled rule against `telemetry`.
    pub fn evaluate(&self, telemetry: &FaultTelemetry) -> FaultEvaluation {
        let mut debounce = self.debounce;
        let mut raised = Vec::new();
        let mut cleared = Vec::new();

        for (rule, counts) in self.rules.iter().zip(debounce.iter_mut()) {
            if !rule.enabled {
                continue;
            }
            let Some(present) = rule.condition(telemetry, &self.thresholds) else {
                continue;
            };
            let active = self.active.contains_key(&rule.code);
            if present {
                counts.present = counts.present.saturating_add(1);
                counts.absent = 0;
                if !active && counts.present >= rule.raise_cycles {
                    raised.push(Fault::raise(rule.code, telemetry.cycle));
                }
            } else {
                counts.absent = counts.absent.saturating_add(1);
                counts.present = 0;
                if active && counts.absent >= rule.clear_cycles {
                    cleared.push(rule.code);
                }
            }
        }

        FaultEvaluation {
            cycle: telemetry.cycle,
            raised,
            cleared,
            debounce,
        }
    }

    /// Apply an evaluation produced by [`Self::evaluate`].
    pub fn commit(&mut self, evaluation: FaultEvaluation) -> FaultChanges {
        self.debounce = evaluation.debounce;
        let mut changes = FaultChanges::default();

        for fault in evaluation.raised {
            if !self.active.contains_key(&fault.code) {
                self.active.insert(fault.code, fault.clone());
                changes.raised.push(fault);
            }
        }
        for code in evaluation.cleared {
            if let Some(mut fault) = self.active.remove(&code) {
                fault.cleared_at = Some(evaluation.cycle);
                changes.cleared.push(fault);
            }
        }
        changes
    }

    /// Clear every active fault whose condition is currently absent.
    ///
    /// Used when an operator RESTART is accepted.
    pub fn acknowledge(&mut self, cycle: u64) -> Vec<Fault> {
        let mut cleared = Vec::new();
        for (rule, counts) in self.rules.iter().zip(self.debounce.iter_mut()) {
            if counts.present > 0 {
                continue;
            }
            if let Some(mut fault) = self.active.remove(&rule.code) {
                fault.cleared_at = Some(cycle);
                *counts = Debounce::default();
                cleared.push(fault);
            }
        }
        cleared
    }

    /// Active faults keyed by code.
    #[inline]
    pub fn active_faults(&self) -> &BTreeMap<FaultCode, Fault> {
        &self.active
    }

    /// Snapshot view keyed by numeric code.
    pub fn views(&self) -> BTreeMap<u16, FaultView> {
        self.active
            .iter()
            .map(|(code, fault)| (code.as_u16(), FaultView::from(fault)))
            .collect()
    }
}
