//! Command/status gateway.
//!
//! The only way into the control loop. Commands are gated against the last
//! published snapshot, then queued on a bounded channel that the loop drains
//! at the start of its next cycle. Reads return the snapshot committed at the
//! end of the last cycle and never block on the loop.
//!
//! ```text
//!  HMI ──submit()──► gate::check ──► sync_channel ──► CycleRunner
//!  HMI ◄──status()── Arc<RideSnapshot> ◄── RwLock ◄── publish()
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};

use parking_lot::RwLock;
use rcc_common::ride::command::Command;
use rcc_common::ride::error::{PreconditionError, UnknownCommand};
use rcc_common::ride::fault::FaultView;
use rcc_common::ride::motor::{DockPosition, MotorStatus};
use rcc_common::ride::snapshot::{LogEntry, RideSnapshot, RideStatus};
use static_assertions::assert_impl_all;
use thiserror::Error;
use tracing::debug;

use crate::command::gate::{self, CommandContext};

/// Command submission failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Rejected by state or authority gating.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// Endpoint name did not parse.
    #[error(transparent)]
    UnknownCommand(#[from] UnknownCommand),

    /// Inbound queue is full; retry next cycle.
    #[error("command queue full")]
    QueueFull,

    /// The control loop has stopped.
    #[error("control loop not running")]
    Disconnected,

    /// Unknown status query.
    #[error("unknown query '{0}'")]
    UnknownQuery(String),

    /// Response encoding failed.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What the loop publishes at the end of each cycle.
#[derive(Debug, Clone)]
pub struct Published {
    /// Ride snapshot.
    pub ride: Arc<RideSnapshot>,
    /// Log tail, oldest first.
    pub log: Arc<[LogEntry]>,
}

impl Default for Published {
    fn default() -> Self {
        Self {
            ride: Arc::new(RideSnapshot::default()),
            log: Arc::from(Vec::new()),
        }
    }
}

type SnapshotCell = Arc<RwLock<Published>>;

/// Status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Ride state, inputs, authority.
    Status,
    /// Active faults.
    Faults,
    /// Motor telemetry.
    Motor,
    /// Log tail.
    Log,
}

impl FromStr for Query {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('/') {
            "status" => Ok(Self::Status),
            "faults" => Ok(Self::Faults),
            "motor" | "motor/status" => Ok(Self::Motor),
            "log" => Ok(Self::Log),
            other => Err(GatewayError::UnknownQuery(other.to_string())),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Status => "status",
            Self::Faults => "faults",
            Self::Motor => "motor",
            Self::Log => "log",
        })
    }
}

/// Cloneable handle for HMI threads.
#[derive(Debug, Clone)]
pub struct Gateway {
    tx: SyncSender<Command>,
    cell: SnapshotCell,
    dispatch_dock: DockPosition,
}

assert_impl_all!(Gateway: Send, Sync, Clone);

impl Gateway {
    /// Gate `command` against the last snapshot and queue it.
    ///
    /// Safety commands wait for room when the queue is full; everything else
    /// fails with [`GatewayError::QueueFull`].
    pub fn submit(&self, command: Command) -> Result<(), GatewayError> {
        let ctx = CommandContext::from_snapshot(&self.snapshot(), self.dispatch_dock);
        gate::check(command, &ctx)?;

        match self.tx.try_send(command) {
            Ok(()) => {
                debug!("Queued {command}");
                Ok(())
            }
            Err(TrySendError::Full(command)) if command.is_safety() => self
                .tx
                .send(command)
                .map_err(|_| GatewayError::Disconnected),
            Err(TrySendError::Full(_)) => Err(GatewayError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(GatewayError::Disconnected),
        }
    }

    /// Parse an endpoint name and submit it.
    pub fn submit_endpoint(&self, endpoint: &str) -> Result<Command, GatewayError> {
        let command: Command = endpoint.parse()?;
        self.submit(command)?;
        Ok(command)
    }

    /// Last committed snapshot.
    #[inline]
    pub fn snapshot(&self) -> Arc<RideSnapshot> {
        Arc::clone(&self.cell.read().ride)
    }

    /// Ride state, inputs and authority.
    pub fn status(&self) -> RideStatus {
        self.snapshot().status()
    }

    /// Active faults keyed by numeric code.
    pub fn faults(&self) -> BTreeMap<u16, FaultView> {
        self.snapshot().faults.clone()
    }

    /// Motor telemetry.
    pub fn motor(&self) -> MotorStatus {
        self.snapshot().motor
    }

    /// Most recent `n` log entries, oldest first.
    pub fn log_tail(&self, n: usize) -> Vec<LogEntry> {
        let log = Arc::clone(&self.cell.read().log);
        let start = log.len().saturating_sub(n);
        log[start..].to_vec()
    }

    /// JSON body for a status endpoint.
    pub fn query_json(&self, query: Query) -> Result<String, GatewayError> {
        let body = match query {
            Query::Status => serde_json::to_string(&self.status())?,
            Query::Faults => serde_json::to_string(&self.faults())?,
            Query::Motor => serde_json::to_string(&self.motor())?,
            Query::Log => serde_json::to_string(&self.log_tail(usize::MAX))?,
        };
        Ok(body)
    }
}

/// Loop side of the gateway.
#[derive(Debug)]
pub(crate) struct CommandInbox {
    rx: Receiver<Command>,
    cell: SnapshotCell,
}

impl CommandInbox {
    /// Next queued command, if any.
    #[inline]
    pub(crate) fn try_recv(&self) -> Option<Command> {
        match self.rx.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Replace the published snapshot.
    pub(crate) fn publish(&self, published: Published) {
        *self.cell.write() = published;
    }
}

/// Bounded command queue plus snapshot cell.
pub(crate) fn channel(capacity: usize, dispatch_dock: DockPosition) -> (Gateway, CommandInbox) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    let cell = SnapshotCell::default();
    (
        Gateway {
            tx,
            cell: Arc::clone(&cell),
            dispatch_dock,
        },
        CommandInbox { rx, cell },
    )
}
