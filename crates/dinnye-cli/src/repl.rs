//! REPL – an interactive host for the gateway.
//!
//! Block commands:
//!   bind <board>                 – address every following call to <board>
//!   led <port> <on|off|level>    – set an LED
//!   rgb [port] <pattern>         – set an RGB strip pattern
//!   motor <port> <speed>         – set a motor speed
//!   drive <direction>            – forward, stop, backward, turnleft, ...
//!   distance | rawdistance | gesture | voltage | temperature | wifi
//!   button <port> | input <port>
//!
//! Slash-commands:
//!   /invoke <opcode> [json]  – run a block with a raw argument bag
//!   /blocks                  – print the block catalog as JSON
//!   /status                  – show binding and gateway settings
//!   /save                    – persist the current binding
//!   /help, /quit | /exit

use colored::Colorize;
use std::io::{self, BufRead, Write};

use dinnye_gateway::{ArgBag, Gateway, ReadOutcome, catalog};
use dinnye_types::{Channel, DeviceCommand, SensorRequest, SensorValue};
use tokio::runtime::Runtime;

use crate::config;

/// One parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Bind(String),
    Command(DeviceCommand),
    Read(SensorRequest),
    Invoke { opcode: String, args: ArgBag },
    Blocks,
    Status,
    Save,
    Help,
    Quit,
}

/// Parse one line of input.  `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<Action>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let action = match (head, rest.as_slice()) {
        ("/help", []) => Action::Help,
        ("/quit" | "/exit", []) => Action::Quit,
        ("/blocks", []) => Action::Blocks,
        ("/status", []) => Action::Status,
        ("/save", []) => Action::Save,
        ("/invoke", [opcode, ..]) => {
            let raw = line
                .trim_start()
                .trim_start_matches("/invoke")
                .trim_start()
                .trim_start_matches(opcode)
                .trim();
            let args = if raw.is_empty() {
                ArgBag::new()
            } else {
                serde_json::from_str(raw).map_err(|e| format!("argument bag must be a JSON object: {e}"))?
            };
            Action::Invoke {
                opcode: (*opcode).to_string(),
                args,
            }
        }
        ("bind", [board]) => Action::Bind((*board).to_string()),
        ("led", [port, state]) => Action::Command(DeviceCommand::Led {
            port: parse_port(port)?,
            state: state.parse().map_err(|e| format!("{e}"))?,
        }),
        ("rgb", [pattern]) => Action::Command(DeviceCommand::RgbPattern {
            port: None,
            pattern: (*pattern).to_string(),
        }),
        ("rgb", [port, pattern]) => Action::Command(DeviceCommand::RgbPattern {
            port: Some(parse_port(port)?),
            pattern: (*pattern).to_string(),
        }),
        ("motor", [port, speed]) => Action::Command(DeviceCommand::Motor {
            port: parse_port(port)?,
            speed: speed
                .parse()
                .map_err(|_| format!("'{speed}' is not a valid speed"))?,
        }),
        ("drive", [direction]) => Action::Command(DeviceCommand::Drive {
            direction: direction.parse().map_err(|e| format!("{e}"))?,
        }),
        (name, args) => {
            let channel: Channel = name
                .parse()
                .map_err(|_| format!("Unknown command: '{name}'"))?;
            let request = match args {
                [] => SensorRequest::new(channel),
                [port] => SensorRequest::with_port(channel, parse_port(port)?),
                _ => return Err(format!("{name} takes at most one port")),
            };
            Action::Read(request.map_err(|e| format!("{e}"))?)
        }
    };
    Ok(Some(action))
}

fn parse_port(raw: &str) -> Result<u16, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a valid port number"))
}

/// Run the REPL until EOF or `/quit`.
pub fn run(gateway: &Gateway, rt: &Runtime) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        let prompt = match gateway.board() {
            Some(board) => format!("dinnye[{board}]>"),
            None => "dinnye>".to_string(),
        };
        print!("{} ", prompt.bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let action = match parse_line(&line) {
            Ok(Some(action)) => action,
            Ok(None) => continue,
            Err(e) => {
                println!("{} Type {} for available commands.", e.red(), "/help".bold());
                continue;
            }
        };

        match action {
            Action::Help => cmd_help(),
            Action::Quit => {
                println!("{}", "Goodbye.".green());
                break;
            }
            Action::Blocks => cmd_blocks(),
            Action::Status => cmd_status(gateway),
            Action::Save => cmd_save(gateway),
            Action::Bind(board) => {
                gateway.bind(board.as_str());
                println!("{} {}", "✓ Bound to".green(), board.bold());
            }
            Action::Command(command) => {
                if gateway.command(command.clone()) {
                    println!("  {} {}", "→".green(), command.to_string().dimmed());
                } else {
                    print_unbound();
                }
            }
            Action::Read(request) => {
                let outcome = rt.block_on(gateway.read(request));
                print_outcome(&request.to_string(), &outcome);
            }
            Action::Invoke { opcode, args } => {
                match rt.block_on(gateway.invoke(&opcode, &args)) {
                    Some(value) => println!("  {} = {}", opcode.bold(), render(&value).green()),
                    None => println!("  {} {}", opcode.bold(), "(no value)".dimmed()),
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "DINNYE Commands".bold().underline());
    println!("  {}          – bind a board", "bind <board>".bold().cyan());
    println!("  {}   – set an LED", "led <port> <on|off|n>".bold().cyan());
    println!("  {}    – set an RGB pattern", "rgb [port] <pattern>".bold().cyan());
    println!("  {}   – set a motor speed", "motor <port> <speed>".bold().cyan());
    println!("  {}   – drive the robot", "drive <direction>".bold().cyan());
    println!(
        "  {}  – read a sensor",
        "distance | rawdistance | gesture | voltage | temperature | wifi".bold().cyan()
    );
    println!("  {}  – read a digital port", "button <port> | input <port>".bold().cyan());
    println!("  {} – run a block with a JSON argument bag", "/invoke <op> [json]".bold().cyan());
    println!("  {}    – print the block catalog", "/blocks".bold().cyan());
    println!("  {}    – show binding and settings", "/status".bold().cyan());
    println!("  {}      – save the current binding", "/save".bold().cyan());
    println!("  {}  – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_blocks() {
    match serde_json::to_string_pretty(&catalog()) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("{}: {}", "Error rendering catalog".red(), e),
    }
}

fn cmd_status(gateway: &Gateway) {
    let cfg = gateway.config();
    println!("{}", "Gateway Status".bold().underline());
    println!(
        "  Board          : {}",
        gateway
            .board()
            .map_or_else(|| "<unbound>".dimmed().to_string(), |b| b.yellow().to_string())
    );
    println!("  Base URL       : {}", cfg.base_url.yellow());
    println!("  Timeout        : {} ms", cfg.timeout_ms);
    println!("  Settling delay : {} ms", cfg.settling_delay_ms);
    println!("  Cache TTL      : {} ms", cfg.cache_ttl_ms);
    println!("  Exclusive      : {}", cfg.exclusive_exchange);
}

fn cmd_save(gateway: &Gateway) {
    let cfg = config::Config {
        board_id: gateway.board(),
        gateway: gateway.config().clone(),
    };
    match config::save(&cfg) {
        Ok(()) => println!(
            "{} {}",
            "✓ Settings saved to".green(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn print_unbound() {
    println!(
        "  {} Use {} first.",
        "No board bound.".yellow(),
        "bind <board>".bold()
    );
}

fn print_outcome(label: &str, outcome: &ReadOutcome) {
    match outcome {
        ReadOutcome::Unbound => print_unbound(),
        ReadOutcome::Fresh(value) => println!("  {} = {}", label.bold(), render(value).green()),
        ReadOutcome::Cached(value) => println!(
            "  {} = {} {}",
            label.bold(),
            render(value).green(),
            "(cached)".dimmed()
        ),
        ReadOutcome::Failed { error, last_known, .. } => {
            println!("  {} {}: {}", label.bold(), "failed".red(), error);
            if let Some(value) = last_known {
                println!("    last known: {}", render(value).dimmed());
            }
        }
    }
}

fn render(value: &SensorValue) -> String {
    match value {
        SensorValue::Text(s) if s.is_empty() => "\"\"".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dinnye_types::{DriveDirection, LedState};

    fn parse(line: &str) -> Action {
        parse_line(line).expect("parse").expect("action")
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse_line("   \n"), Ok(None));
    }

    #[test]
    fn block_commands() {
        assert_eq!(parse("bind AB-12"), Action::Bind("AB-12".into()));
        assert_eq!(
            parse("led 1 off"),
            Action::Command(DeviceCommand::Led { port: 1, state: LedState::Off })
        );
        assert_eq!(
            parse("rgb rrr-ggg"),
            Action::Command(DeviceCommand::RgbPattern { port: None, pattern: "rrr-ggg".into() })
        );
        assert_eq!(
            parse("rgb 2 bbb"),
            Action::Command(DeviceCommand::RgbPattern { port: Some(2), pattern: "bbb".into() })
        );
        assert_eq!(
            parse("motor 1 -50"),
            Action::Command(DeviceCommand::Motor { port: 1, speed: -50 })
        );
        assert_eq!(
            parse("drive TurnRight"),
            Action::Command(DeviceCommand::Drive { direction: DriveDirection::TurnRight })
        );
    }

    #[test]
    fn sensor_reads() {
        assert_eq!(
            parse("voltage"),
            Action::Read(SensorRequest::new(Channel::Voltage).unwrap())
        );
        assert_eq!(
            parse("button 3"),
            Action::Read(SensorRequest::with_port(Channel::Button, 3).unwrap())
        );
        assert!(parse_line("button").is_err());
        assert!(parse_line("distance 2").is_err());
    }

    #[test]
    fn invoke_with_argument_bag() {
        let Action::Invoke { opcode, args } = parse(r#"/invoke led {"PORT": 1, "VALUE": "on"}"#) else {
            panic!("expected invoke");
        };
        assert_eq!(opcode, "led");
        assert_eq!(args.get("VALUE"), Some(&serde_json::json!("on")));

        assert_eq!(
            parse("/invoke distance"),
            Action::Invoke { opcode: "distance".into(), args: ArgBag::new() }
        );
        assert!(parse_line("/invoke led [1]").is_err());
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse_line("fly").unwrap_err().contains("Unknown command"));
        assert!(parse_line("led x on").unwrap_err().contains("port"));
        assert!(parse_line("drive sideways").is_err());
        assert!(parse_line("motor 1 fast").is_err());
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse("/help"), Action::Help);
        assert_eq!(parse("/exit"), Action::Quit);
        assert_eq!(parse("/blocks"), Action::Blocks);
        assert_eq!(parse("/status"), Action::Status);
        assert_eq!(parse("/save"), Action::Save);
    }
}
