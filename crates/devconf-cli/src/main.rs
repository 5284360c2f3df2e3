//! `devconf` – interactive shell around the device configuration engine.
//!
//! This binary:
//!
//! 1. Loads `~/.devconf/config.toml`, writing the defaults on first run.
//! 2. Initialises tracing (compact or JSON, optional OTLP export).
//! 3. Starts a [`Lifecycle`] over a simulated sensor and drops the user into
//!    a REPL that feeds configuration documents through it.
//! 4. Intercepts **Ctrl-C** to stop the REPL and enter the destroying state.

mod config;
mod repl;
mod sink;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use devconf_model::{DeviceContext, NoopConfigure};
use devconf_runtime::{Lifecycle, init_tracing};
use devconf_sensor::SimSensor;
use devconf_types::ProcessState;

use crate::config::LogFormat;
use crate::sink::ConsoleSink;

fn main() {
    let cfg = match config::load() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  Wrote default config to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    // ── Structured logging ────────────────────────────────────────────────
    let telemetry = init_tracing("devconf", cfg.log_format == LogFormat::Json);

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let context = DeviceContext::with_collaborators(
        Box::new(SimSensor::new().with_defaults()),
        Box::new(NoopConfigure),
    );
    let sink = ConsoleSink::new(cfg.state_dump_path.clone());
    let mut lifecycle = Lifecycle::new(context, sink, cfg.topic.clone(), telemetry.log_level());

    let initial = ProcessState::from_document(cfg.initial_process_state);
    lifecycle.start(initial);
    println!(
        "  Topic {} · state {}",
        cfg.topic.bold(),
        initial.to_string().bold()
    );
    if let Some(path) = &cfg.state_dump_path {
        println!("  State mirrored to {}", path.display().to_string().dimmed());
    }

    println!();
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&mut lifecycle, shutdown);

    lifecycle.shutdown();
    println!(
        "  {} state(s) dispatched.",
        lifecycle.sink().sent().to_string().bold()
    );
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║   devconf · device configuration     ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
}
