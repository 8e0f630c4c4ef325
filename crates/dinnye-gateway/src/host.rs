//! Host bridge: the block catalog a visual-programming host renders, and
//! [`Gateway::invoke`], which runs a block from the host's loosely-typed
//! argument bag.
//!
//! Argument bags are JSON objects keyed by the upper-case argument names
//! from the catalog (`PORT`, `VALUE`, `PATTERN`, `COMMAND`).  Values are
//! cast the way a block host casts them:
//!
//! | Target | Rule |
//! |---|---|
//! | number | numbers as-is, numeric strings parsed, `true`/`false` → 1/0, anything else → 0 |
//! | string | strings as-is, whole numbers without a fraction, `null`/missing → `""` |
//!
//! Reporter and boolean blocks map their [`ReadOutcome`] through
//! [`ReadOutcome::into_reporter`], so failures surface as the domain's
//! sentinel rather than an error.

use dinnye_types::{Channel, DriveDirection, LedState, SensorValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::gateway::Gateway;
use crate::reader::ReadOutcome;

/// The host's opaque argument bag.
pub type ArgBag = serde_json::Map<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Command,
    Reporter,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    Number,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ArgumentType,
    pub default_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSpec {
    pub opcode: String,
    pub block_type: BlockType,
    /// Label with `[ARG]` placeholders.
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub text: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSpec {
    pub name: String,
    pub accept_reporters: bool,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCatalog {
    pub id: String,
    pub name: String,
    pub blocks: Vec<BlockSpec>,
    pub menus: Vec<MenuSpec>,
}

impl BlockCatalog {
    pub fn block(&self, opcode: &str) -> Option<&BlockSpec> {
        self.blocks.iter().find(|b| b.opcode == opcode)
    }
}

fn arg(name: &str, kind: ArgumentType, default_value: &str) -> ArgumentSpec {
    ArgumentSpec {
        name: name.to_string(),
        kind,
        default_value: default_value.to_string(),
        menu: None,
    }
}

fn block(opcode: &str, block_type: BlockType, text: &str, arguments: Vec<ArgumentSpec>) -> BlockSpec {
    BlockSpec {
        opcode: opcode.to_string(),
        block_type,
        text: text.to_string(),
        arguments,
    }
}

/// Describe every block this extension offers.
pub fn catalog() -> BlockCatalog {
    use ArgumentType::{Number, String as Str};

    let port = || arg("PORT", Number, "1");
    let pattern = || arg("PATTERN", Str, "rrr-ggg");
    let command = ArgumentSpec {
        menu: Some("commands".to_string()),
        ..arg("COMMAND", Str, DriveDirection::Forward.as_str())
    };

    let mut blocks = vec![
        block("led", BlockType::Command, "led [PORT] [VALUE]", vec![port(), arg("VALUE", Str, "on")]),
        block("rgbled", BlockType::Command, "rgbled [PORT] [PATTERN]", vec![port(), pattern()]),
        block("rgbledsimple", BlockType::Command, "rgbled [PATTERN]", vec![pattern()]),
        block("motor", BlockType::Command, "motor [PORT] [VALUE]", vec![port(), arg("VALUE", Number, "10")]),
        block("drive", BlockType::Command, "drive [COMMAND]", vec![command]),
    ];
    blocks.extend(Channel::ALL.into_iter().map(|channel| {
        if channel.takes_port() {
            block(channel.name(), BlockType::Boolean, &format!("{} [PORT]", channel.name()), vec![port()])
        } else {
            block(channel.name(), BlockType::Reporter, channel.name(), Vec::new())
        }
    }));

    BlockCatalog {
        id: "dinnye".to_string(),
        name: "DINNYE".to_string(),
        blocks,
        menus: vec![MenuSpec {
            name: "commands".to_string(),
            accept_reporters: true,
            items: DriveDirection::ALL
                .into_iter()
                .map(|d| MenuItem {
                    text: d.as_str().to_string(),
                    value: d.as_str().to_string(),
                })
                .collect(),
        }],
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument casting
// ─────────────────────────────────────────────────────────────────────────────

/// Cast a host value to a number; unparseable input is 0.
pub fn cast_number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() { 0.0 } else { t.parse().unwrap_or(0.0) }
        }
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if n.is_nan() { 0.0 } else { n }
}

/// Cast a host value to text.
pub fn cast_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Cast a host value to a port number.  Fractions truncate; values outside
/// the `u16` range are rejected.
pub fn cast_port(value: Option<&Value>) -> Option<u16> {
    let n = cast_number(value).trunc();
    (0.0..=f64::from(u16::MAX)).contains(&n).then_some(n as u16)
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation
// ─────────────────────────────────────────────────────────────────────────────

impl Gateway {
    /// Run block `opcode` with the host's argument bag.
    ///
    /// Command blocks (and `bind`) return `None`.  Reporter and boolean blocks
    /// return their reading, the domain sentinel on failure, or `None` while
    /// no board is bound.  Unknown opcodes and malformed arguments are logged
    /// and return `None`.
    pub async fn invoke(&self, opcode: &str, args: &ArgBag) -> Option<SensorValue> {
        let port = || {
            let port = cast_port(args.get("PORT"));
            if port.is_none() {
                warn!(opcode, port = ?args.get("PORT"), "port out of range; block ignored");
            }
            port
        };

        match opcode {
            "bind" => self.bind(cast_string(args.get("BOARD"))),
            "led" => {
                let raw = cast_string(args.get("VALUE"));
                match raw.parse::<LedState>() {
                    Ok(state) => self.set_led(port()?, state),
                    Err(err) => warn!(%err, "led block ignored"),
                }
            }
            "rgbled" => self.set_rgb_pattern_at(port()?, cast_string(args.get("PATTERN"))),
            "rgbledsimple" => self.set_rgb_pattern(cast_string(args.get("PATTERN"))),
            "motor" => {
                let speed = cast_number(args.get("VALUE")).trunc() as i32;
                self.set_motor(port()?, speed);
            }
            "drive" => {
                let raw = cast_string(args.get("COMMAND").or_else(|| args.get("TEXT")));
                match raw.parse::<DriveDirection>() {
                    Ok(direction) => self.drive(direction),
                    Err(err) => warn!(%err, "drive block ignored"),
                }
            }
            _ => {
                let Ok(channel) = opcode.parse::<Channel>() else {
                    warn!(opcode, "unknown block opcode");
                    return None;
                };
                let outcome: ReadOutcome = match channel {
                    Channel::Button => self.button(port()?).await,
                    Channel::Input => self.input(port()?).await,
                    Channel::Distance => self.distance().await,
                    Channel::RawDistance => self.raw_distance().await,
                    Channel::Gesture => self.gesture().await,
                    Channel::Voltage => self.voltage().await,
                    Channel::Temperature => self.temperature().await,
                    Channel::Wifi => self.wifi().await,
                };
                return outcome.into_reporter();
            }
        }
        None
    }
}
