//! Command precondition gating.
//!
//! A rejected command returns a [`PreconditionError`] to its submitter and has
//! no other effect. Safety commands (estop, estop_release, stop,
//! disable_servos) and bookkeeping commands (toggle_webcontrols, heartbeat)
//! are always accepted. Dock, encoder-home and enable_servos have no
//! physical counterpart and are gated on state only.

use rcc_common::ride::command::Command;
use rcc_common::ride::error::PreconditionError;
use rcc_common::ride::fault::FaultCode;
use rcc_common::ride::motor::{DockPosition, DockState};
use rcc_common::ride::snapshot::RideSnapshot;
use rcc_common::ride::state::{ControlAuthority, RideState};

use crate::authority::check_web;

/// Everything a precondition check looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    /// Current ride state.
    pub state: RideState,
    /// Current authority mode.
    pub authority: ControlAuthority,
    /// Ride subsystem powered.
    pub powered: bool,
    /// Lowest-numbered active fault, any severity.
    pub active_fault: Option<FaultCode>,
    /// Actuator outputs armed.
    pub outputs_enabled: bool,
    /// Loading dock state.
    pub dock: DockState,
    /// Dock position required for dispatch.
    pub dispatch_dock: DockPosition,
}

impl CommandContext {
    /// Context as seen by a snapshot reader.
    pub fn from_snapshot(snapshot: &RideSnapshot, dispatch_dock: DockPosition) -> Self {
        Self {
            state: snapshot.state,
            authority: snapshot.authority,
            powered: snapshot.powered,
            active_fault: snapshot
                .first_fault_code()
                .and_then(FaultCode::from_u16),
            outputs_enabled: snapshot.motor.outputs_enabled,
            dock: snapshot.motor.dock,
            dispatch_dock,
        }
    }
}

/// Check `command` against `ctx`.
pub fn check(command: Command, ctx: &CommandContext) -> Result<(), PreconditionError> {
    let invalid = || PreconditionError::InvalidState {
        command,
        state: ctx.state,
    };

    match command {
        Command::Estop
        | Command::EstopRelease
        | Command::Stop
        | Command::DisableServos
        | Command::ToggleWebControls
        | Command::Heartbeat => Ok(()),

        Command::Dispatch => {
            check_web(ctx.authority, command)?;
            if ctx.state != RideState::Idle {
                return Err(invalid());
            }
            if !ctx.powered {
                return Err(PreconditionError::RideOff { command });
            }
            if let Some(code) = ctx.active_fault {
                return Err(PreconditionError::FaultActive { command, code });
            }
            if !ctx.outputs_enabled {
                return Err(PreconditionError::OutputsDisabled { command });
            }
            if ctx.dock.at_rest() != Some(ctx.dispatch_dock) {
                return Err(PreconditionError::DockNotReady {
                    command,
                    dock: ctx.dock,
                });
            }
            Ok(())
        }

        Command::RideOff => {
            check_web(ctx.authority, command)?;
            if ctx.state != RideState::Idle {
                return Err(invalid());
            }
            Ok(())
        }

        Command::Restart => {
            check_web(ctx.authority, command)?;
            match ctx.state {
                RideState::Estop | RideState::Fault | RideState::Stopped => Ok(()),
                _ => Err(invalid()),
            }
        }

        Command::MaintenanceEnter => {
            check_web(ctx.authority, command)?;
            if !matches!(ctx.state, RideState::Idle | RideState::Stopped) {
                return Err(invalid());
            }
            if !ctx.powered {
                return Err(PreconditionError::RideOff { command });
            }
            Ok(())
        }

        Command::MaintenanceExit => {
            check_web(ctx.authority, command)?;
            if ctx.state != RideState::Maintenance {
                return Err(invalid());
            }
            Ok(())
        }

        Command::Jog(_) | Command::GoHome => {
            check_web(ctx.authority, command)?;
            if !ctx.state.accepts_manual_motion() {
                return Err(invalid());
            }
            if !ctx.powered {
                return Err(PreconditionError::RideOff { command });
            }
            if !ctx.outputs_enabled {
                return Err(PreconditionError::OutputsDisabled { command });
            }
            Ok(())
        }

        Command::ResetEncoder => {
            if ctx.state == RideState::Running {
                return Err(PreconditionError::NotIdle);
            }
            Ok(())
        }

        Command::SetDock(_) => {
            if ctx.state.is_ride_motion() {
                return Err(invalid());
            }
            if !ctx.outputs_enabled {
                return Err(PreconditionError::OutputsDisabled { command });
            }
            Ok(())
        }

        Command::EnableServos => {
            if ctx.state.is_ride_motion() {
                return Err(invalid());
            }
            Ok(())
        }
    }
}
