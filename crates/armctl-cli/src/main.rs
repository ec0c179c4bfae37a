//! `armctl` – operator console for the 6-axis arm controller.
//!
//! 1. Loads `~/.armctl/config.toml`, writing the defaults on first run.
//! 2. Starts the controller and the telemetry sampler on a Tokio runtime.
//! 3. Prints audit records and emergency alerts as they happen.
//! 4. Drops the operator into the REPL.
//! 5. Turns **Ctrl-C** into an emergency stop before exiting.

mod config;
mod repl;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use armctl_hal::SimThermalSensor;
use armctl_kernel::{SafetyInterlock, Supervisor};
use armctl_kinematics::ChainConfig;
use armctl_memory::PositionLog;
use armctl_middleware::{EventBus, Topic};
use armctl_runtime::{
    Controller, ControllerHandle, DEFAULT_QUEUE_DEPTH, TelemetrySampler, UserCommand,
};
use armctl_types::{ArmError, AuditLevel, EventPayload, SystemState, Tone};
use colored::Colorize;
use tracing::{info, warn};

use crate::config::Config;

fn main() {
    let _tracing = armctl_runtime::init_tracing("armctl");

    print_banner();
    let cfg = load_or_create_config();
    let chain = cfg.chain_config().unwrap_or_else(|e| {
        println!("{}: {} – using default geometry", "Config error".red(), e);
        ChainConfig::default()
    });

    let sensor = match SimThermalSensor::new(cfg.temperature_min_c, cfg.temperature_max_c) {
        Ok(sensor) => sensor,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start the temperature sensor".red(), e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start the Tokio runtime".red(), e);
            std::process::exit(1);
        }
    };

    // ── Controller and sampler ────────────────────────────────────────────
    let bus = EventBus::default();
    let mut supervisor = Supervisor::new(
        chain,
        SafetyInterlock::with_overheat_threshold(cfg.overheat_threshold_c),
    );
    supervisor.set_movement_style(cfg.movement_style);
    let (controller, handle) = Controller::new(
        supervisor,
        PositionLog::new(&cfg.positions_path),
        bus.clone(),
        DEFAULT_QUEUE_DEPTH,
    );

    let sampler = {
        let _enter = runtime.enter();
        spawn_log_panel(&bus);
        tokio::spawn(controller.run());
        TelemetrySampler::new(sensor, handle.clone(), cfg.telemetry_interval()).spawn()
    };
    info!(
        positions = %cfg.positions_path.display(),
        threshold_c = cfg.overheat_threshold_c,
        "arm controller running"
    );

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    install_ctrlc(handle.clone(), shutdown.clone());

    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );
    repl::run(&handle, &chain, shutdown);

    // ── Teardown ──────────────────────────────────────────────────────────
    // The Ctrl-C handler keeps a handle for the life of the process, so the
    // controller is torn down with the runtime rather than awaited.
    if sampler.is_finished() {
        warn!("telemetry sampler exited before shutdown");
    }
    let frames = runtime.block_on(sampler.stop());
    let state = handle.snapshot().state;
    info!(frames, %state, "arm controller stopped");
    if state != SystemState::Off {
        println!(
            "  {} arm left in state '{}'",
            "Note:".yellow(),
            state.as_str()
        );
    }
    runtime.shutdown_timeout(Duration::from_millis(200));
}

// ─────────────────────────────────────────────────────────────────────────────
// Startup
// ─────────────────────────────────────────────────────────────────────────────

/// Load the config, or fall back to the defaults when its safety values are
/// unusable.
fn load_or_create_config() -> Config {
    let cfg = read_or_create_config();
    match cfg.validate() {
        Ok(()) => cfg,
        Err(e) => {
            println!("{}: {} – using default configuration", "Config error".red(), e);
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn read_or_create_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

/// Print every audit record at info and above, plus emergency banners.
fn spawn_log_panel(bus: &EventBus) {
    let mut audit = bus.subscribe_to(Topic::Audit);
    tokio::spawn(async move {
        while let Some(event) = audit.next().await {
            if let EventPayload::Audit(record) = event.payload
                && record.level >= AuditLevel::Info
            {
                let tone = match record.level {
                    AuditLevel::Warning => Tone::Caution,
                    AuditLevel::Error | AuditLevel::Critical => Tone::Alarm,
                    _ => Tone::Neutral,
                };
                println!("\n  {}", repl::paint(&record.to_string(), tone));
            }
        }
    });

    let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
    tokio::spawn(async move {
        while let Some(event) = alerts.next().await {
            if let EventPayload::EmergencyStop { reason } = event.payload {
                println!(
                    "\n  {} {}",
                    "⚠  EMERGENCY STOP".red().bold(),
                    format!("({reason}) – motion disabled, use /clear_fault to recover").red()
                );
            }
        }
    });
}

fn install_ctrlc(handle: ControllerHandle, shutdown: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the arm …".yellow().bold());
        match handle.blocking_dispatch(UserCommand::EmergencyStop("Operator interrupt".into())) {
            Ok(fb) if fb.accepted => println!("{}", "  ✓ Emergency stop engaged.".green()),
            Ok(_) | Err(ArmError::InvalidTransition { .. }) => {
                println!("{}", "  ✓ Arm already stopped.".green())
            }
            Err(e) => println!("  {}: {}", "Emergency stop failed".red(), e),
        }
        shutdown.store(true, Ordering::SeqCst);
        println!("{}", "  ✓ Exiting armctl.".green());
        std::process::exit(130);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will not stop the arm");
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   __ _ _ __ _ __ ___   ___| |_| |"#.bold().cyan());
    println!("{}", r#"  / _` | '__| '_ ` _ \ / __| __| |"#.bold().cyan());
    println!("{}", r#" | (_| | |  | | | | | | (__| |_| |"#.bold().cyan());
    println!("{}", r#"  \__,_|_|  |_| |_| |_|\___|\__|_|"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "armctl".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  6-axis arm supervisory controller");
    println!();
}
