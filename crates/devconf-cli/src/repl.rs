//! REPL – Read-Eval-Print Loop for the devconf interactive shell.
//!
//! Supported slash-commands:
//!   /apply <file> – queue and apply a configuration document from a file
//!   /send <json>  – queue and apply an inline configuration document
//!   /state        – print the current outbound state document
//!   /pending      – show pending configuration and notification flags
//!   /help         – show this list
//!   /quit | /exit – gracefully exit the shell

use colored::Colorize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use devconf_runtime::{Lifecycle, Processed, StateSink};
use serde_json::Value;

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run<S: StateSink>(lifecycle: &mut Lifecycle<S>, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "devconf>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }
        let (verb, arg) = cmd.split_once(' ').unwrap_or((cmd, ""));

        match verb {
            "/help" => cmd_help(),
            "/apply" => cmd_apply(lifecycle, arg.trim()),
            "/send" => submit(lifecycle, arg.trim()),
            "/state" => cmd_state(lifecycle),
            "/pending" => cmd_pending(lifecycle),
            "/quit" | "/exit" => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            other => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "devconf Commands".bold().underline());
    println!("  {} – apply a configuration file", "/apply <file>".bold().cyan());
    println!("  {}  – apply an inline JSON document", "/send <json>".bold().cyan());
    println!("  {}        – print the outbound state", "/state".bold().cyan());
    println!("  {}      – show pending flags", "/pending".bold().cyan());
    println!("  {}  – exit the shell", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_apply<S: StateSink>(lifecycle: &mut Lifecycle<S>, path: &str) {
    if path.is_empty() {
        println!("{} /apply <file>", "Usage:".yellow());
        return;
    }
    match fs::read_to_string(path) {
        Ok(text) => submit(lifecycle, &text),
        Err(e) => println!("{} {}: {}", "Cannot read".red(), path.yellow(), e),
    }
}

/// Queue `text` and run one apply cycle.
fn submit<S: StateSink>(lifecycle: &mut Lifecycle<S>, text: &str) {
    if !lifecycle.on_configuration(text) {
        println!(
            "{}",
            "Ignored: not an object, no req_info.req_id, or req_id already applied.".yellow()
        );
        return;
    }
    match lifecycle.process_pending() {
        Ok(Processed::Applied) => println!("{}", "✓ Configuration applied.".green()),
        Ok(Processed::Rejected(err)) => {
            println!("{} {} ({})", "✗ Rejected:".red(), err, err.code().as_u32())
        }
        Ok(Processed::Nothing) => println!("{}", "Nothing pending.".dimmed()),
        Err(e) => println!("{}: {}", "Dispatch error".red(), e),
    }
    println!(
        "  state: {}",
        lifecycle.context().current_state().to_string().bold()
    );
}

fn cmd_state<S: StateSink>(lifecycle: &Lifecycle<S>) {
    match lifecycle.context().serialize() {
        Ok(state) => {
            let pretty = serde_json::from_str::<Value>(state.as_str())
                .ok()
                .and_then(|v| serde_json::to_string_pretty(&v).ok())
                .unwrap_or_else(|| state.as_str().to_string());
            println!("{}", pretty);
        }
        Err(e) => println!("{}: {}", "Serialize error".red(), e),
    }
}

fn cmd_pending<S: StateSink>(lifecycle: &Lifecycle<S>) {
    let context = lifecycle.context();
    let flag = |set: bool| if set { "yes".yellow() } else { "no".dimmed() };
    println!(
        "  configuration pending : {}",
        flag(context.has_pending_configuration())
    );
    println!(
        "  notification pending  : {}",
        flag(context.is_pending_notification())
    );
    println!(
        "  state                 : {} → {}",
        context.current_state().to_string().bold(),
        context.next_state().to_string().bold()
    );
}
