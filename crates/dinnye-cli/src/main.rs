//! `dinnye` – command line host for a DINNYE board.
//!
//! 1. Loads `~/.dinnye/config.toml` (defaults when absent) plus `DINNYE_*`
//!    environment overrides.
//! 2. Builds a [`Gateway`] over HTTP, or over an in-process simulated board
//!    with `--sim`.
//! 3. Drops the user into an interactive REPL.
//! 4. Intercepts **Ctrl-C** to send `drive stop` to the bound board before
//!    exiting.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

use dinnye_gateway::Gateway;
use dinnye_transport::SimBoard;
use dinnye_types::{DeviceCommand, DriveDirection};

/// Board id the simulated board answers to when none is configured.
const SIM_BOARD_ID: &str = "SIM-01";

fn main() {
    let _telemetry = dinnye_gateway::init_tracing("dinnye");

    print_banner();

    let simulate = std::env::args().skip(1).any(|a| a == "--sim");

    let cfg = match config::load() {
        Ok(cfg) => {
            if config::config_path().exists() {
                println!(
                    "  Config loaded from {}",
                    config::config_path().display().to_string().bold()
                );
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };
    // Commands spawn onto the ambient runtime.
    let _enter = rt.enter();

    let gateway = if simulate {
        let board_id = cfg.board_id.clone().unwrap_or_else(|| SIM_BOARD_ID.to_string());
        let gateway = Gateway::new(cfg.gateway.clone(), Arc::new(SimBoard::new(board_id.as_str())));
        gateway.bind(board_id.as_str());
        println!("  {} simulated board {}", "Using".yellow(), board_id.bold());
        gateway
    } else {
        println!("  Board server at {}", cfg.gateway.base_url.dimmed());
        let gateway = Gateway::http(cfg.gateway.clone());
        if let Some(board) = cfg.board_id.as_deref() {
            gateway.bind(board);
        }
        gateway
    };
    let gateway = Arc::new(gateway);

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let gateway_ctrlc = Arc::clone(&gateway);
    let handle = rt.handle().clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());

        let stop = DeviceCommand::Drive {
            direction: DriveDirection::Stop,
        };
        match handle.block_on(gateway_ctrlc.dispatcher().send(&stop)) {
            Some(Ok(_)) => println!("{}", "  ✓ drive stop acknowledged.".green()),
            Some(Err(e)) => println!("{} {}", "  ✗ drive stop failed:".red(), e),
            None => println!("{}", "  (no board bound)".dimmed()),
        }
        println!("{}", "  ✓ Exiting.".green());
        std::process::exit(130);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the robot will not be stopped on Ctrl-C");
    }

    match gateway.board() {
        Some(board) => println!("  Bound to {}", board.bold()),
        None => println!("  {}  Use {} to pick a board.", "No board bound.".dimmed(), "bind <board>".bold()),
    }
    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(&gateway, &rt);
}

fn print_banner() {
    println!();
    println!("{}", r#"   ___  _____  ___  ____  ______"#.bold().cyan());
    println!("{}", r#"  / _ \/  _/ |/ / |/ /\ \/ / __/"#.bold().cyan());
    println!("{}", r#" / // // //    /    /  \  / _/  "#.bold().cyan());
    println!("{}", r#"/____/___/_/|_/_/|_/   /_/___/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "DINNYE".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Board gateway for block-based programs");
    println!();
}
