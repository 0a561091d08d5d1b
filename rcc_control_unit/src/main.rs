//! # RCC Control Unit
//!
//! Ride-control loop binary. Loads the config, creates the configured ride
//! I/O driver, and runs the control loop on a dedicated thread. With
//! `--console`, stdin accepts gateway endpoint names (`dispatch`,
//! `motor/creep_fwd`, ...) and the queries `status`, `faults`, `motor`, `log`.

use clap::Parser;
use rcc_common::ride::config::RccConfig;
use rcc_control_unit::config::load_config;
use rcc_control_unit::cycle::{CycleRunner, rt_setup};
use rcc_control_unit::gateway::{Gateway, Query};
use rcc_hal::DriverRegistry;
use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// RCC Control Unit - ride-control loop
#[derive(Parser, Debug)]
#[command(name = "rcc_control_unit")]
#[command(version)]
#[command(about = "Deterministic ride-control loop with command/status gateway")]
struct Args {
    /// Path to the RCC configuration TOML.
    #[arg(short, long, default_value = "config/rcc.toml")]
    config: PathBuf,

    /// Override the driver named in the config.
    #[arg(short, long)]
    driver: Option<String>,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// Read commands and queries from stdin.
    #[arg(long)]
    console: bool,

    /// CPU core to pin the loop thread to (rt feature only).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt feature only).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config);
    setup_tracing(&args, config.as_ref().ok());

    info!("RCC Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("RCC Control Unit shutdown complete");
}

fn run(args: &Args, config: RccConfig) -> Result<(), Box<dyn std::error::Error>> {
    if args.config.exists() {
        info!("Config: {}", args.config.display());
    } else {
        warn!("Config {} not found, running on defaults", args.config.display());
    }
    info!(
        "Service '{}': cycle_time={}µs, {} ride phases, fault debounce {}/{}",
        config.shared.service_name,
        config.cycle.cycle_time_us,
        config.ride.phases.len(),
        config.faults.raise_cycles,
        config.faults.clear_cycles,
    );

    let driver_name = args.driver.as_deref().unwrap_or(&config.hal.driver);
    let driver = DriverRegistry::with_builtin_drivers().create_driver(driver_name)?;
    info!("Driver '{}' v{}", driver.name(), driver.version());

    let (mut runner, gateway) = CycleRunner::new(&config, driver)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    })?;

    let (cpu_core, rt_priority, max_cycles) = (args.cpu_core, args.rt_priority, args.cycles);
    let flag = Arc::clone(&shutdown);
    let loop_thread = std::thread::Builder::new()
        .name("rcc-cycle".to_string())
        .spawn(move || {
            rt_setup(cpu_core, rt_priority)?;
            runner.run(&flag, max_cycles)
        })?;

    if args.console {
        run_console(&gateway, &shutdown);
    }

    match loop_thread.join() {
        Ok(result) => result?,
        Err(_) => return Err("control loop thread panicked".into()),
    }
    Ok(())
}

/// Line console on stdin. Returns on EOF, `quit`, or shutdown.
fn run_console(gateway: &Gateway, shutdown: &AtomicBool) {
    info!("Console ready: endpoint names, status | faults | motor | log, quit");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        if let Ok(query) = line.parse::<Query>() {
            match gateway.query_json(query) {
                Ok(body) => println!("{body}"),
                Err(e) => println!("error: {e}"),
            }
            continue;
        }
        match gateway.submit_endpoint(line) {
            Ok(command) => println!("ok: {command}"),
            Err(e) => println!("rejected: {e}"),
        }
    }
    shutdown.store(true, Ordering::SeqCst);
}

/// Setup tracing subscriber: `RUST_LOG`, then `--verbose`, then config `log_level`.
fn setup_tracing(args: &Args, config: Option<&RccConfig>) {
    let level = if args.verbose {
        "debug"
    } else {
        config.map_or("info", |c| c.shared.log_level.as_str())
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
