//! Control authority arbiter.
//!
//! Sole owner of [`ControlAuthority`]. The mode changes only through
//! [`ControlAuthorityArbiter::toggle`]; the state machine never writes it.

use rcc_common::ride::command::Command;
use rcc_common::ride::error::PreconditionError;
use rcc_common::ride::state::ControlAuthority;

/// Holds the authority mode and remembers whether it flipped this cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlAuthorityArbiter {
    mode: ControlAuthority,
    changed: bool,
}

impl ControlAuthorityArbiter {
    /// Start in `mode`.
    pub const fn new(mode: ControlAuthority) -> Self {
        Self {
            mode,
            changed: false,
        }
    }

    /// Flip PHYSICAL ↔ WEB and return the new mode.
    pub fn toggle(&mut self) -> ControlAuthority {
        self.mode = self.mode.toggled();
        self.changed = !self.changed;
        self.mode
    }

    /// Current mode.
    #[inline]
    pub const fn mode(&self) -> ControlAuthority {
        self.mode
    }

    /// Whether the mode differs from the start of the cycle. Resets the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Reject `command` unless authority is WEB.
    pub fn require_web(&self, command: Command) -> Result<(), PreconditionError> {
        check_web(self.mode, command)
    }
}

/// Reject `command` unless `authority` is WEB.
#[inline]
pub fn check_web(authority: ControlAuthority, command: Command) -> Result<(), PreconditionError> {
    if authority == ControlAuthority::Web {
        Ok(())
    } else {
        Err(PreconditionError::AuthorityRequired { command, authority })
    }
}
