//! Input registry.
//!
//! Holds the raw readings of both sources and merges them into the
//! [`EffectiveInputs`] view. The merge itself is the pure function
//! [`effective_inputs`]; the registry only keeps the raw banks current.
//!
//! Web inputs are not wired levels but commands, so they are held here as
//! latches (ESTOP, RIDE_OFF) and one-cycle pulses (STOP, DISPATCH, RESTART).

use rcc_common::ride::command::Command;
use rcc_common::ride::input::{DiscreteInput, EffectiveInputs, InputFlags, InputName, InputSource};
use rcc_common::ride::state::ControlAuthority;

/// Merge physical and web banks under the current authority.
///
/// - ESTOP, STOP: physical OR web, never masked.
/// - DISPATCH: exclusive by source, the authority holder's bank only.
/// - RIDE_OFF, RESTART: physical always, web only under WEB authority.
pub fn effective_inputs(
    physical: InputFlags,
    web: InputFlags,
    authority: ControlAuthority,
) -> EffectiveInputs {
    let mut merged = (physical | web) & InputFlags::SAFETY;
    match authority {
        ControlAuthority::Physical => {
            merged |= physical & (InputFlags::DISPATCH | InputFlags::RIDE_OFF | InputFlags::RESTART);
        }
        ControlAuthority::Web => {
            merged |= physical & (InputFlags::RIDE_OFF | InputFlags::RESTART);
            merged |= web & (InputFlags::DISPATCH | InputFlags::RIDE_OFF | InputFlags::RESTART);
        }
    }
    EffectiveInputs::from_flags(merged)
}

/// Raw per-source input banks with change timestamps.
#[derive(Debug, Clone)]
pub struct InputRegistry {
    physical: InputFlags,
    web_latched: InputFlags,
    web_pulse: InputFlags,
    /// Banks as of the last `latch`, for change detection.
    seen: [InputFlags; 2],
    /// Cycle of the last level change, `[source][input]`.
    changed_at: [[u64; 5]; 2],
    last_web_contact: u64,
}

impl InputRegistry {
    /// All inputs de-asserted, web link considered alive at cycle 0.
    pub const fn new() -> Self {
        Self {
            physical: InputFlags::empty(),
            web_latched: InputFlags::empty(),
            web_pulse: InputFlags::empty(),
            seen: [InputFlags::empty(); 2],
            changed_at: [[0; 5]; 2],
            last_web_contact: 0,
        }
    }

    /// Apply a web command's effect on the virtual inputs.
    ///
    /// Any web command counts as link contact. Commands without an input
    /// effect (jog, dock, ...) only refresh the contact time.
    pub fn apply_web(&mut self, command: Command, cycle: u64) {
        self.last_web_contact = cycle;
        match command {
            Command::Estop => self.web_latched.insert(InputFlags::ESTOP),
            Command::EstopRelease => self.web_latched.remove(InputFlags::ESTOP),
            Command::RideOff => self.web_latched.toggle(InputFlags::RIDE_OFF),
            Command::Stop => self.web_pulse.insert(InputFlags::STOP),
            Command::Dispatch => self.web_pulse.insert(InputFlags::DISPATCH),
            Command::Restart => self.web_pulse.insert(InputFlags::RESTART),
            _ => {}
        }
    }

    /// Latch this cycle's physical bank and record level changes.
    pub fn latch(&mut self, physical: InputFlags, cycle: u64) {
        self.physical = physical;
        let banks = [self.physical, self.web()];
        for (source, bank) in banks.into_iter().enumerate() {
            let changed = bank ^ self.seen[source];
            if changed.is_empty() {
                continue;
            }
            for name in InputName::ALL {
                if changed.contains(name.flag()) {
                    self.changed_at[source][name.index()] = cycle;
                }
            }
            self.seen[source] = bank;
        }
    }

    /// Drop one-cycle web pulses. Called after the state machine has run.
    pub fn end_cycle(&mut self) {
        self.web_pulse = InputFlags::empty();
    }

    /// Last latched physical bank.
    #[inline]
    pub fn physical(&self) -> InputFlags {
        self.physical
    }

    /// Current web bank (latches and pulses).
    #[inline]
    pub fn web(&self) -> InputFlags {
        self.web_latched | self.web_pulse
    }

    /// Effective view under `authority`.
    #[inline]
    pub fn effective(&self, authority: ControlAuthority) -> EffectiveInputs {
        effective_inputs(self.physical, self.web(), authority)
    }

    /// Whether the web ESTOP latch is set.
    #[inline]
    pub fn web_estop_latched(&self) -> bool {
        self.web_latched.contains(InputFlags::ESTOP)
    }

    /// Cycles since the last web heartbeat or command.
    #[inline]
    pub fn web_silent_cycles(&self, cycle: u64) -> u64 {
        cycle.saturating_sub(self.last_web_contact)
    }

    /// Raw readings of both sources, physical first.
    pub fn readings(&self) -> Vec<DiscreteInput> {
        let banks = [
            (InputSource::Physical, self.seen[0]),
            (InputSource::Web, self.seen[1]),
        ];
        let mut out = Vec::with_capacity(banks.len() * InputName::ALL.len());
        for (source_idx, (source, bank)) in banks.into_iter().enumerate() {
            for name in InputName::ALL {
                out.push(DiscreteInput {
                    name,
                    source,
                    asserted: bank.contains(name.flag()),
                    timestamp: self.changed_at[source_idx][name.index()],
                });
            }
        }
        out
    }
}

impl Default for InputRegistry {
    fn default() -> Self {
        Self::new()
    }
}
