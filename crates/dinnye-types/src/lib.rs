//! `dinnye-types` – shared vocabulary for the DINNYE board gateway.
//!
//! Every other crate in the workspace speaks in terms of these types:
//! [`Channel`] names a sensor reading path, [`SensorValue`] carries a coerced
//! reading, and [`DeviceCommand`] describes an actuator call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────────────────────────────────────

/// One named sensor reading path on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Distance,
    RawDistance,
    Gesture,
    Voltage,
    Temperature,
    Wifi,
    Button,
    Input,
}

impl Channel {
    /// Number of declared channels.
    pub const COUNT: usize = 8;

    /// Every declared channel, in cache-slot order.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Distance,
        Channel::RawDistance,
        Channel::Gesture,
        Channel::Voltage,
        Channel::Temperature,
        Channel::Wifi,
        Channel::Button,
        Channel::Input,
    ];

    /// Stable slot index in `0..Channel::COUNT`.
    pub const fn index(self) -> usize {
        match self {
            Channel::Distance => 0,
            Channel::RawDistance => 1,
            Channel::Gesture => 2,
            Channel::Voltage => 3,
            Channel::Temperature => 4,
            Channel::Wifi => 5,
            Channel::Button => 6,
            Channel::Input => 7,
        }
    }

    /// Path segment used by the device for this channel's sample command.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Result domain of this channel's readings.
    pub fn domain(self) -> ResultDomain {
        self.descriptor().domain
    }

    /// Whether the sample command carries a numeric port argument.
    pub fn takes_port(self) -> bool {
        self.descriptor().takes_port
    }

    /// Static descriptor for this channel.
    pub fn descriptor(self) -> &'static ChannelDescriptor {
        &CHANNELS[self.index()]
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Channel::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| TypesError::UnknownChannel(s.to_string()))
    }
}

/// The value domain a channel's raw response text is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultDomain {
    Integer,
    Float,
    Text,
    Boolean,
}

/// Static, immutable description of one read channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub channel: Channel,
    pub name: &'static str,
    pub domain: ResultDomain,
    pub takes_port: bool,
}

/// Descriptor table, indexed by [`Channel::index`].
pub static CHANNELS: [ChannelDescriptor; Channel::COUNT] = [
    ChannelDescriptor {
        channel: Channel::Distance,
        name: "distance",
        domain: ResultDomain::Integer,
        takes_port: false,
    },
    ChannelDescriptor {
        channel: Channel::RawDistance,
        name: "rawdistance",
        domain: ResultDomain::Integer,
        takes_port: false,
    },
    ChannelDescriptor {
        channel: Channel::Gesture,
        name: "gesture",
        domain: ResultDomain::Text,
        takes_port: false,
    },
    ChannelDescriptor {
        channel: Channel::Voltage,
        name: "voltage",
        domain: ResultDomain::Float,
        takes_port: false,
    },
    ChannelDescriptor {
        channel: Channel::Temperature,
        name: "temperature",
        domain: ResultDomain::Integer,
        takes_port: false,
    },
    ChannelDescriptor {
        channel: Channel::Wifi,
        name: "wifi",
        domain: ResultDomain::Integer,
        takes_port: false,
    },
    ChannelDescriptor {
        channel: Channel::Button,
        name: "button",
        domain: ResultDomain::Boolean,
        takes_port: true,
    },
    ChannelDescriptor {
        channel: Channel::Input,
        name: "input",
        domain: ResultDomain::Boolean,
        takes_port: true,
    },
];

/// A single sensor read: the channel plus its port, if the channel takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorRequest {
    pub channel: Channel,
    pub port: Option<u16>,
}

impl SensorRequest {
    /// Request a portless channel.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::PortRequired`] for `button` and `input`.
    pub fn new(channel: Channel) -> Result<Self, TypesError> {
        if channel.takes_port() {
            return Err(TypesError::PortRequired(channel));
        }
        Ok(Self { channel, port: None })
    }

    /// Request a port-addressed channel (`button`, `input`).
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::PortNotAccepted`] for channels without a port.
    pub fn with_port(channel: Channel, port: u16) -> Result<Self, TypesError> {
        if !channel.takes_port() {
            return Err(TypesError::PortNotAccepted(channel));
        }
        Ok(Self {
            channel,
            port: Some(port),
        })
    }
}

impl fmt::Display for SensorRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}/{}", self.channel, port),
            None => write!(f, "{}", self.channel),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────────────────────

/// A coerced sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl SensorValue {
    /// Placeholder the block host receives when a read of `domain` fails.
    ///
    /// Boolean reporters receive the empty text, which the host renders as
    /// neither `true` nor `false`.
    pub fn sentinel(domain: ResultDomain) -> Self {
        match domain {
            ResultDomain::Integer => SensorValue::Integer(-1),
            ResultDomain::Float => SensorValue::Float(-1.0),
            ResultDomain::Text | ResultDomain::Boolean => SensorValue::Text(String::new()),
        }
    }

    /// The domain this value belongs to.
    pub fn domain(&self) -> ResultDomain {
        match self {
            SensorValue::Integer(_) => ResultDomain::Integer,
            SensorValue::Float(_) => ResultDomain::Float,
            SensorValue::Text(_) => ResultDomain::Text,
            SensorValue::Boolean(_) => ResultDomain::Boolean,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Integer(v) => write!(f, "{v}"),
            SensorValue::Float(v) => write!(f, "{v}"),
            SensorValue::Text(v) => f.write_str(v),
            SensorValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Drivetrain direction tokens understood by the board's `drive` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveDirection {
    Forward,
    Stop,
    Backward,
    TurnLeft,
    TurnRight,
    Left,
    Right,
}

impl DriveDirection {
    pub const ALL: [DriveDirection; 7] = [
        DriveDirection::Forward,
        DriveDirection::Stop,
        DriveDirection::Backward,
        DriveDirection::TurnLeft,
        DriveDirection::TurnRight,
        DriveDirection::Left,
        DriveDirection::Right,
    ];

    /// The token placed in the command URL.
    pub const fn as_str(self) -> &'static str {
        match self {
            DriveDirection::Forward => "forward",
            DriveDirection::Stop => "stop",
            DriveDirection::Backward => "backward",
            DriveDirection::TurnLeft => "turnleft",
            DriveDirection::TurnRight => "turnright",
            DriveDirection::Left => "left",
            DriveDirection::Right => "right",
        }
    }
}

impl fmt::Display for DriveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveDirection {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DriveDirection::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| TypesError::UnknownDirection(s.to_string()))
    }
}

/// Target state of a single LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedState {
    On,
    Off,
    /// Numeric level, passed through to the board unchanged.
    Level(u32),
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedState::On => f.write_str("on"),
            LedState::Off => f.write_str("off"),
            LedState::Level(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for LedState {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        match t.to_ascii_lowercase().as_str() {
            "on" => Ok(LedState::On),
            "off" => Ok(LedState::Off),
            _ => t
                .parse::<u32>()
                .map(LedState::Level)
                .map_err(|_| TypesError::InvalidLedState(s.to_string())),
        }
    }
}

/// A fire-and-forget actuator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DeviceCommand {
    Led { port: u16, state: LedState },
    /// RGB strip pattern, optionally addressed to a specific strip port.
    #[serde(rename = "rgbled")]
    RgbPattern { port: Option<u16>, pattern: String },
    Motor { port: u16, speed: i32 },
    Drive { direction: DriveDirection },
}

impl DeviceCommand {
    /// Command name as it appears in the URL (`led`, `rgbled`, `motor`, `drive`).
    pub const fn op_name(&self) -> &'static str {
        match self {
            DeviceCommand::Led { .. } => "led",
            DeviceCommand::RgbPattern { .. } => "rgbled",
            DeviceCommand::Motor { .. } => "motor",
            DeviceCommand::Drive { .. } => "drive",
        }
    }

    /// Path segments following the op name: optional port, then the value.
    pub fn arguments(&self) -> Vec<String> {
        match self {
            DeviceCommand::Led { port, state } => vec![port.to_string(), state.to_string()],
            DeviceCommand::RgbPattern { port, pattern } => port
                .iter()
                .map(u16::to_string)
                .chain(std::iter::once(pattern.clone()))
                .collect(),
            DeviceCommand::Motor { port, speed } => vec![port.to_string(), speed.to_string()],
            DeviceCommand::Drive { direction } => vec![direction.to_string()],
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.op_name(), self.arguments().join("/"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while building typed requests from loosely-typed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Unknown drive direction: {0}")]
    UnknownDirection(String),

    #[error("Invalid LED state: {0} (expected on, off or a number)")]
    InvalidLedState(String),

    #[error("Channel {0} requires a port")]
    PortRequired(Channel),

    #[error("Channel {0} does not take a port")]
    PortNotAccepted(Channel),
}
