//! Deterministic control cycle.
//!
//! One [`CycleRunner`] owns every piece of mutable ride state and the driver.
//! Each cycle runs, in order:
//!
//! 1. Drain the gateway queue; re-gate each command against live state.
//! 2. `driver.sample()`: panel inputs + motor telemetry.
//! 3. Merge effective inputs under the current authority.
//! 4. Evaluate and commit faults.
//! 5. Acknowledge resolved faults if a RESTART is about to be accepted.
//! 6. Advance the ride state machine.
//! 7. Compute setpoints, `driver.write()`.
//! 8. Publish the snapshot.
//!
//! Errors and panics in steps 1-7 are caught at the cycle boundary: outputs
//! are forced safe and INTERNAL_ERROR is raised on the next cycle. The loop
//! itself keeps running.
//!
//! ## RT Setup
//! With the `rt` feature: `mlockall`, stack prefault, CPU pinning and
//! `SCHED_FIFO`, then absolute-deadline sleeping on `CLOCK_MONOTONIC`.
//! Without it all RT calls are no-ops and the loop paces with `thread::sleep`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rcc_common::hal::driver::{HalError, RideIo};
use rcc_common::ride::command::{Command, MotorCommand};
use rcc_common::ride::config::RccConfig;
use rcc_common::ride::fault::{FaultCode, FaultSeverity};
use rcc_common::ride::input::EffectiveInputs;
use rcc_common::ride::motor::DockPosition;
use rcc_common::ride::snapshot::{LogEntry, RideSnapshot};
use rcc_common::ride::state::RideState;
use rcc_hal::HomePersistence;
use static_assertions::assert_impl_all;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::audit::AuditLog;
use crate::authority::ControlAuthorityArbiter;
use crate::command::gate::{self, CommandContext};
use crate::fault::{FaultChanges, FaultMonitor, FaultTelemetry};
use crate::gateway::{self, CommandInbox, Gateway, Published};
use crate::input::InputRegistry;
use crate::motor::MotorController;
use crate::state::{CycleDecision, MachineInputs, MachineParams, MaintenanceRequest, RideStateMachine};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles whose body exceeded the period.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (returns 0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or inside a cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    /// Driver initialization failed.
    #[error("driver init failed: {0}")]
    Init(#[source] HalError),

    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Driver I/O failed mid-cycle.
    #[error("driver error: {0}")]
    Driver(#[from] HalError),

    /// The cycle body panicked.
    #[error("cycle panicked: {0}")]
    Panic(String),
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch stack pages so the first cycles do not fault them in.
#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(not(feature = "rt"))]
fn prefault_stack() {}

/// Pin the current thread to `cpu`.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// Set SCHED_FIFO with the given RT priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup sequence. Call on the loop thread before [`CycleRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the driver and all ride state; the single writer.
pub struct CycleRunner {
    driver: Box<dyn RideIo>,
    inbox: CommandInbox,
    queue_capacity: usize,
    dispatch_dock: DockPosition,

    registry: InputRegistry,
    arbiter: ControlAuthorityArbiter,
    machine: RideStateMachine,
    monitor: FaultMonitor,
    motor: MotorController,
    audit: AuditLog,

    cycle: u64,
    cycle_time_ns: i64,
    dt: Duration,
    stats: CycleStats,
    maintenance: Option<MaintenanceRequest>,
    internal_error: bool,
    last_error: Option<CycleError>,
    last_inputs: EffectiveInputs,
    last_motor_command: MotorCommand,
    last_log: Arc<[LogEntry]>,
}

assert_impl_all!(CycleRunner: Send);

impl CycleRunner {
    /// Initialize `driver`, load the home reference and open the gateway.
    ///
    /// # Errors
    /// [`CycleError::Init`] if the driver does not come up.
    pub fn new(config: &RccConfig, mut driver: Box<dyn RideIo>) -> Result<(Self, Gateway), CycleError> {
        driver.init().map_err(CycleError::Init)?;

        let persistence = config.hal.state_file.as_ref().map(HomePersistence::new);
        let motor = MotorController::new(config, persistence);
        let capacity = config.cycle.command_queue_capacity;
        let dispatch_dock = config.sequence.dispatch_dock;
        let (gateway, inbox) = gateway::channel(capacity, dispatch_dock);

        let mut audit = AuditLog::new();
        audit.info(
            0,
            &format!(
                "RCC started: driver '{}' v{}, cycle {} µs",
                driver.name(),
                driver.version(),
                config.cycle.cycle_time_us
            ),
        );
        if motor.persistence_failed() {
            audit.warn(0, "Home position could not be loaded, using 0");
        }

        let mut runner = Self {
            driver,
            inbox,
            queue_capacity: capacity,
            dispatch_dock,
            registry: InputRegistry::new(),
            arbiter: ControlAuthorityArbiter::default(),
            machine: RideStateMachine::new(MachineParams::from_config(config)),
            monitor: FaultMonitor::new(config),
            motor,
            audit,
            cycle: 0,
            cycle_time_ns: i64::from(config.cycle.cycle_time_us) * 1000,
            dt: Duration::from_micros(u64::from(config.cycle.cycle_time_us)),
            stats: CycleStats::new(),
            maintenance: None,
            internal_error: false,
            last_error: None,
            last_inputs: EffectiveInputs::default(),
            last_motor_command: MotorCommand::Disable,
            last_log: Arc::from(Vec::new()),
        };
        runner.publish();
        Ok((runner, gateway))
    }

    /// Run one cycle. Never fails; a failing cycle is recorded and recovered.
    pub fn step(&mut self) {
        self.cycle += 1;
        let cycle = self.cycle;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.cycle_body(cycle)));
        self.last_error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(CycleError::Panic(panic_message(&*payload))),
        };
        if let Some(err) = self.last_error.clone() {
            self.recover(cycle, &err);
        }

        self.registry.end_cycle();
        self.publish();
    }

    /// Enter the cycle loop until `shutdown` is set or `max_cycles` have run.
    ///
    /// Drives the outputs safe and shuts the driver down on exit.
    pub fn run(&mut self, shutdown: &AtomicBool, max_cycles: Option<u64>) -> Result<(), CycleError> {
        info!(
            "Control loop running (cycle {} ns, driver '{}')",
            self.cycle_time_ns,
            self.driver.name()
        );

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(shutdown, max_cycles);

        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(shutdown, max_cycles);

        self.shutdown();
        result
    }

    /// RT cycle loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, shutdown: &AtomicBool, max_cycles: Option<u64>) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")));
        let mut next_wake = now()?;

        while !self.should_stop(shutdown, max_cycles) {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let cycle_start = now()?;
            self.step();
            let cycle_end = now()?;

            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            let latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();
            self.record_timing(duration_ns, latency_ns);

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Simulation cycle loop using `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, shutdown: &AtomicBool, max_cycles: Option<u64>) -> Result<(), CycleError> {
        use std::time::Instant;

        let period = Duration::from_nanos(self.cycle_time_ns.unsigned_abs());
        while !self.should_stop(shutdown, max_cycles) {
            let cycle_start = Instant::now();
            self.step();
            let elapsed = cycle_start.elapsed();
            self.record_timing(i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX), 0);

            if let Some(remaining) = period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    fn should_stop(&self, shutdown: &AtomicBool, max_cycles: Option<u64>) -> bool {
        shutdown.load(Ordering::Relaxed) || max_cycles.is_some_and(|max| self.cycle >= max)
    }

    fn record_timing(&mut self, duration_ns: i64, latency_ns: i64) {
        self.stats.record(duration_ns, latency_ns);
        if duration_ns > self.cycle_time_ns {
            self.stats.overruns += 1;
            if self.stats.overruns.is_power_of_two() {
                warn!(
                    "Cycle overrun: {duration_ns} ns > {} ns ({} total)",
                    self.cycle_time_ns, self.stats.overruns
                );
            }
        }
    }

    /// Force outputs safe and release the driver.
    fn shutdown(&mut self) {
        if let Err(e) = self.driver.force_safe() {
            error!("force_safe on shutdown failed: {e}");
        }
        if let Err(e) = self.driver.shutdown() {
            error!("Driver shutdown failed: {e}");
        }
        info!(
            "Control loop stopped after {} cycles (avg {} ns, max {} ns, {} overruns)",
            self.cycle,
            self.stats.avg_cycle_ns(),
            self.stats.max_cycle_ns,
            self.stats.overruns
        );
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Cycles executed.
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current ride state.
    #[inline]
    pub fn state(&self) -> RideState {
        self.machine.current_state()
    }

    /// Timing statistics.
    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Error recovered in the last cycle, if any.
    #[inline]
    pub fn last_error(&self) -> Option<&CycleError> {
        self.last_error.as_ref()
    }

    // ─── Cycle Body ─────────────────────────────────────────────────

    fn cycle_body(&mut self, cycle: u64) -> Result<(), CycleError> {
        // 1. Commands queued since the last cycle.
        for _ in 0..self.queue_capacity {
            let Some(command) = self.inbox.try_recv() else {
                break;
            };
            self.apply_command(command, cycle);
        }

        // 2. Sample.
        let sample = self.driver.sample(self.dt);
        match self.motor.ingest(&sample) {
            Ok(()) => {}
            Err(stale) if stale.stale_cycles == 1 => self.audit.warn(cycle, &stale.to_string()),
            Err(stale) => debug!("{stale}"),
        }
        let panel = match &sample {
            Ok(status) => status.panel,
            Err(_) => self.registry.physical(),
        };
        self.registry.latch(panel, cycle);

        // 3. Effective inputs.
        let authority_changed = self.arbiter.take_changed();
        let authority = self.arbiter.mode();
        let inputs = self.registry.effective(authority);
        self.last_inputs = inputs;

        // 4. Faults.
        let telemetry = FaultTelemetry {
            cycle,
            motor: self.motor.status(),
            inputs,
            authority,
            state: self.machine.current_state(),
            web_silent_cycles: self.registry.web_silent_cycles(cycle),
            running_cycles: self.machine.running_cycles(),
            motion_wait_cycles: self.machine.motion_wait_cycles(),
            internal_error: std::mem::take(&mut self.internal_error),
            persistence_failed: self.motor.persistence_failed(),
        };
        let changes = self.monitor.commit(self.monitor.evaluate(&telemetry));
        self.log_fault_changes(cycle, &changes);

        // 5-6. State machine.
        let input = MachineInputs {
            inputs,
            authority_changed,
            maintenance: self.maintenance.take(),
        };
        if self.machine.wants_restart(&input) {
            for fault in self.monitor.acknowledge(cycle) {
                self.audit
                    .info(cycle, &format!("Fault {} acknowledged: {}", fault.code, fault.message));
            }
        }
        let decision = self
            .machine
            .handle_cycle(&input, self.monitor.active_faults(), &self.motor.status());
        self.log_decision(cycle, &decision);
        self.last_motor_command = decision.motor_command;

        // 7. Setpoints.
        let commands = self.motor.control(decision.motor_command, cycle);
        self.driver.write(&commands)?;
        Ok(())
    }

    fn command_context(&self) -> CommandContext {
        let status = self.motor.status();
        CommandContext {
            state: self.machine.current_state(),
            authority: self.arbiter.mode(),
            powered: self.machine.powered(),
            active_fault: self.monitor.active_faults().keys().next().copied(),
            outputs_enabled: status.outputs_enabled,
            dock: status.dock,
            dispatch_dock: self.dispatch_dock,
        }
    }

    fn apply_command(&mut self, command: Command, cycle: u64) {
        if let Err(e) = gate::check(command, &self.command_context()) {
            self.audit.warn(cycle, &format!("Rejected {command}: {e}"));
            return;
        }
        let state = self.machine.current_state();
        let was_latched = self.registry.web_estop_latched();
        self.registry.apply_web(command, cycle);

        let result = match command {
            Command::Estop => {
                self.audit.warn(cycle, "Web ESTOP latched");
                Ok(())
            }
            Command::EstopRelease => {
                if was_latched {
                    self.audit.info(cycle, "Web ESTOP released");
                }
                Ok(())
            }
            Command::Stop => {
                self.audit.info(cycle, "Web STOP");
                Ok(())
            }
            Command::ToggleWebControls => {
                let mode = self.arbiter.toggle();
                self.audit.info(cycle, &format!("Control authority → {mode}"));
                Ok(())
            }
            Command::MaintenanceEnter => {
                self.maintenance = Some(MaintenanceRequest::Enter);
                Ok(())
            }
            Command::MaintenanceExit => {
                self.maintenance = Some(MaintenanceRequest::Exit);
                Ok(())
            }
            Command::Jog(direction) => self.motor.jog(direction, state, cycle),
            Command::ResetEncoder => self.motor.reset_encoder_home(state).map(|home| {
                self.audit.info(cycle, &format!("Encoder home set to {home}"));
            }),
            Command::SetDock(position) => self.motor.set_loading_dock(position, state),
            Command::DisableServos => {
                self.motor.disable_servos();
                self.audit.warn(cycle, "Actuator outputs disabled");
                Ok(())
            }
            Command::EnableServos => self.motor.enable_servos(state),
            Command::GoHome => self.motor.go_home(state),
            Command::Dispatch | Command::RideOff | Command::Restart | Command::Heartbeat => Ok(()),
        };
        if let Err(e) = result {
            self.audit.warn(cycle, &format!("Rejected {command}: {e}"));
        }
    }

    fn log_fault_changes(&mut self, cycle: u64, changes: &FaultChanges) {
        for fault in &changes.raised {
            let msg = format!("Fault {} raised ({}): {}", fault.code, fault.severity, fault.message);
            match fault.severity {
                FaultSeverity::Warning => self.audit.warn(cycle, &msg),
                FaultSeverity::Critical | FaultSeverity::EstopLevel => self.audit.error(cycle, &msg),
            }
        }
        for fault in &changes.cleared {
            self.audit.info(cycle, &format!("Fault {} cleared", fault.code));
        }
    }

    fn log_decision(&mut self, cycle: u64, decision: &CycleDecision) {
        if let Some(t) = decision.transition {
            let msg = format!("{} → {}: {}", t.from, t.to, t.reason);
            match t.to {
                RideState::Estop | RideState::Fault => self.audit.warn(cycle, &msg),
                _ => self.audit.info(cycle, &msg),
            }
        }
        if decision.power_changed {
            let msg = if decision.powered {
                "Ride powered on"
            } else {
                "Ride powered off"
            };
            self.audit.info(cycle, msg);
        }
    }

    /// Outputs off; INTERNAL_ERROR on the next evaluation.
    fn recover(&mut self, cycle: u64, err: &CycleError) {
        self.internal_error = true;
        self.last_motor_command = MotorCommand::SafeStop;
        self.audit.error(
            cycle,
            &format!("Cycle failed, outputs forced safe ({}): {err}", FaultCode::InternalError),
        );
        if let Err(e) = self.driver.force_safe() {
            error!("force_safe failed: {e}");
        }
    }

    fn publish(&mut self) {
        let ride = RideSnapshot {
            cycle: self.cycle,
            state: self.machine.current_state(),
            powered: self.machine.powered(),
            authority: self.arbiter.mode(),
            inputs: self.last_inputs,
            readings: self.registry.readings(),
            faults: self.monitor.views(),
            motor: self.motor.status(),
            motor_command: self.last_motor_command,
        };
        if let Some(log) = self.audit.take_snapshot() {
            self.last_log = log;
        }
        self.inbox.publish(Published {
            ride: Arc::new(ride),
            log: Arc::clone(&self.last_log),
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

/// Add nanoseconds to a TimeSpec.
#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// Compute the difference (a - b) in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
