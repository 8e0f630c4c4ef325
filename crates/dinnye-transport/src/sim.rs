//! In-process board simulation for headless runs and CI without hardware.
//!
//! [`SimBoard`] answers the same REST dialect as a physical DINNYE board:
//!
//! | Path (after the base URL) | Effect |
//! |---|---|
//! | `/<board>/command/led/<port>/<on\|off\|level>` | store LED state |
//! | `/<board>/command/rgbled[/<port>]/<pattern>` | store RGB pattern |
//! | `/<board>/command/motor/<port>/<speed>` | store motor speed |
//! | `/<board>/command/drive/<direction>` | store drive direction |
//! | `/<board>/command/<channel>[/<port>]` | latch a reading into the sample register |
//! | `/<board>/response` | return the sample register |
//!
//! Like the real firmware there is a single sample register shared by every
//! channel.  Anything else, including a different board id, is answered with
//! HTTP 404.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use dinnye_transport::{SimBoard, Transport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let board = SimBoard::new("AB-12");
//! board.update_readings(|r| r.distance = 87);
//!
//! let t = Duration::from_secs(1);
//! board.fetch("http://sim/AB-12/command/distance", t).await.unwrap();
//! assert_eq!(board.fetch("http://sim/AB-12/response", t).await.unwrap(), "87");
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dinnye_types::{Channel, DeviceCommand, DriveDirection, LedState};
use tracing::debug;

use crate::transport::{Transport, TransportError};

/// Body the simulated firmware returns for every accepted command.
pub const ACK: &str = "ok";

/// Sensor values the simulated board reports when sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct SimReadings {
    pub distance: i64,
    pub raw_distance: i64,
    pub gesture: String,
    pub voltage: f64,
    pub temperature: i64,
    pub wifi: i64,
    /// Ports whose button is currently held down.
    pub pressed_buttons: BTreeSet<u16>,
    /// Ports whose digital input is currently high.
    pub high_inputs: BTreeSet<u16>,
}

impl Default for SimReadings {
    fn default() -> Self {
        Self {
            distance: 120,
            raw_distance: 1180,
            gesture: "none".to_string(),
            voltage: 3.7,
            temperature: 24,
            wifi: -58,
            pressed_buttons: BTreeSet::new(),
            high_inputs: BTreeSet::new(),
        }
    }
}

impl SimReadings {
    fn sample(&self, channel: Channel, port: Option<u16>) -> String {
        let on_off = |set: &BTreeSet<u16>| {
            let high = port.is_some_and(|p| set.contains(&p));
            (if high { "on" } else { "off" }).to_string()
        };
        match channel {
            Channel::Distance => self.distance.to_string(),
            Channel::RawDistance => self.raw_distance.to_string(),
            Channel::Gesture => self.gesture.clone(),
            Channel::Voltage => self.voltage.to_string(),
            Channel::Temperature => self.temperature.to_string(),
            Channel::Wifi => self.wifi.to_string(),
            Channel::Button => on_off(&self.pressed_buttons),
            Channel::Input => on_off(&self.high_inputs),
        }
    }
}

/// Actuator state accumulated from accepted commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimActuators {
    pub leds: BTreeMap<u16, LedState>,
    /// Keyed by strip port; `None` is the unaddressed default strip.
    pub rgb_patterns: BTreeMap<Option<u16>, String>,
    pub motors: BTreeMap<u16, i32>,
    pub drive: Option<DriveDirection>,
}

#[derive(Default)]
struct BoardState {
    readings: SimReadings,
    actuators: SimActuators,
    register: String,
    commands: Vec<DeviceCommand>,
}

/// A simulated DINNYE board implementing [`Transport`] in-process.
pub struct SimBoard {
    board_id: String,
    state: Mutex<BoardState>,
}

impl SimBoard {
    /// Create a simulated board answering to `board_id`.
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            state: Mutex::new(BoardState::default()),
        }
    }

    /// Mutate the readings the board will report on its next sample.
    pub fn update_readings(&self, f: impl FnOnce(&mut SimReadings)) {
        f(&mut self.lock().readings);
    }

    /// Snapshot of the actuator state.
    pub fn actuators(&self) -> SimActuators {
        self.lock().actuators.clone()
    }

    /// Every actuator command accepted so far, in arrival order.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.lock().commands.clone()
    }

    /// Current content of the shared sample register.
    pub fn register(&self) -> String {
        self.lock().register.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, url: &str) -> Result<String, TransportError> {
        let segments: Vec<&str> = path_of(url)
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let Some(pos) = segments.iter().position(|s| *s == self.board_id) else {
            return Err(TransportError::Status(404));
        };

        match &segments[pos + 1..] {
            ["response"] => Ok(self.lock().register.clone()),
            ["command", op, args @ ..] => self.command(op, args),
            _ => Err(TransportError::Status(404)),
        }
    }

    fn command(&self, op: &str, args: &[&str]) -> Result<String, TransportError> {
        if let Ok(channel) = op.parse::<Channel>() {
            let port = match (channel.takes_port(), args) {
                (false, []) => None,
                (true, [port]) => Some(parse_port(port)?),
                _ => return Err(TransportError::Status(404)),
            };
            let mut state = self.lock();
            let sample = state.readings.sample(channel, port);
            debug!(board = %self.board_id, %channel, ?port, %sample, "sim sample latched");
            state.register = sample;
            return Ok(ACK.to_string());
        }

        let command = match (op, args) {
            ("led", [port, value]) => DeviceCommand::Led {
                port: parse_port(port)?,
                state: value.parse().map_err(|_| TransportError::Status(400))?,
            },
            ("rgbled", [pattern]) => DeviceCommand::RgbPattern {
                port: None,
                pattern: (*pattern).to_string(),
            },
            ("rgbled", [port, pattern]) => DeviceCommand::RgbPattern {
                port: Some(parse_port(port)?),
                pattern: (*pattern).to_string(),
            },
            ("motor", [port, speed]) => DeviceCommand::Motor {
                port: parse_port(port)?,
                speed: speed.parse().map_err(|_| TransportError::Status(400))?,
            },
            ("drive", [direction]) => DeviceCommand::Drive {
                direction: direction.parse().map_err(|_| TransportError::Status(400))?,
            },
            _ => return Err(TransportError::Status(404)),
        };

        let mut state = self.lock();
        match &command {
            DeviceCommand::Led { port, state: led } => {
                state.actuators.leds.insert(*port, *led);
            }
            DeviceCommand::RgbPattern { port, pattern } => {
                state.actuators.rgb_patterns.insert(*port, pattern.clone());
            }
            DeviceCommand::Motor { port, speed } => {
                state.actuators.motors.insert(*port, *speed);
            }
            DeviceCommand::Drive { direction } => {
                state.actuators.drive = Some(*direction);
            }
        }
        debug!(board = %self.board_id, %command, "sim command applied");
        state.commands.push(command);
        Ok(ACK.to_string())
    }
}

#[async_trait]
impl Transport for SimBoard {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String, TransportError> {
        self.handle(url)
    }
}

/// Path component of `url`, or `url` itself when it carries no scheme.
fn path_of(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => url,
    }
}

fn parse_port(raw: &str) -> Result<u16, TransportError> {
    raw.parse().map_err(|_| TransportError::Status(400))
}
