//! [`Gateway`] – one board binding, one cache, and the read and write paths
//! that share them.

use std::sync::Arc;

use dinnye_transport::{HttpTransport, Transport};
use dinnye_types::{Channel, DeviceCommand, DriveDirection, LedState, SensorRequest};
use tracing::info;

use crate::binding::BoardBinding;
use crate::cache::ChannelCache;
use crate::config::GatewayConfig;
use crate::device::DeviceLink;
use crate::dispatcher::CommandDispatcher;
use crate::reader::{ReadOutcome, SensorReader};

/// Client-side gateway to a DINNYE board.
///
/// Commands return immediately and never report failure; reads return a
/// [`ReadOutcome`].  Every operation is a silent no-op until [`bind`] has
/// been called with a non-empty board id.
///
/// [`bind`]: Gateway::bind
pub struct Gateway {
    config: GatewayConfig,
    binding: Arc<BoardBinding>,
    dispatcher: CommandDispatcher,
    reader: SensorReader,
}

impl Gateway {
    pub fn new(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let binding = Arc::new(BoardBinding::new());
        let link = DeviceLink::new(transport, &config.base_url, config.timeout());
        let cache = Arc::new(ChannelCache::new(config.cache_ttl()));
        Self {
            dispatcher: CommandDispatcher::new(Arc::clone(&binding), link.clone()),
            reader: SensorReader::new(
                Arc::clone(&binding),
                link,
                cache,
                config.settling_delay(),
                config.exclusive_exchange,
            ),
            binding,
            config,
        }
    }

    /// Gateway over the network via [`HttpTransport`].
    pub fn http(config: GatewayConfig) -> Self {
        Self::new(config, Arc::new(HttpTransport::new()))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Bind to a board.  Cached readings from a previous board stay until
    /// they expire.
    pub fn bind(&self, board_id: impl Into<String>) {
        let board_id = board_id.into();
        info!(%board_id, "board bound");
        self.binding.bind(board_id);
    }

    pub fn board(&self) -> Option<String> {
        self.binding.current()
    }

    pub fn cache(&self) -> &ChannelCache {
        self.reader.cache()
    }

    // ── write path ──────────────────────────────────────────────────────────

    /// Fire `command` at the bound board.  Returns whether a request was
    /// started.
    pub fn command(&self, command: DeviceCommand) -> bool {
        self.dispatcher.dispatch(command)
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn set_led(&self, port: u16, state: LedState) {
        self.command(DeviceCommand::Led { port, state });
    }

    pub fn set_led_on(&self, port: u16) {
        self.set_led(port, LedState::On);
    }

    pub fn set_led_off(&self, port: u16) {
        self.set_led(port, LedState::Off);
    }

    pub fn set_rgb_pattern(&self, pattern: impl Into<String>) {
        self.command(DeviceCommand::RgbPattern {
            port: None,
            pattern: pattern.into(),
        });
    }

    pub fn set_rgb_pattern_at(&self, port: u16, pattern: impl Into<String>) {
        self.command(DeviceCommand::RgbPattern {
            port: Some(port),
            pattern: pattern.into(),
        });
    }

    pub fn set_motor(&self, port: u16, speed: i32) {
        self.command(DeviceCommand::Motor { port, speed });
    }

    pub fn drive(&self, direction: DriveDirection) {
        self.command(DeviceCommand::Drive { direction });
    }

    // ── read path ───────────────────────────────────────────────────────────

    pub async fn read(&self, request: SensorRequest) -> ReadOutcome {
        self.reader.read(request).await
    }

    pub async fn distance(&self) -> ReadOutcome {
        self.read(portless(Channel::Distance)).await
    }

    pub async fn raw_distance(&self) -> ReadOutcome {
        self.read(portless(Channel::RawDistance)).await
    }

    pub async fn gesture(&self) -> ReadOutcome {
        self.read(portless(Channel::Gesture)).await
    }

    pub async fn voltage(&self) -> ReadOutcome {
        self.read(portless(Channel::Voltage)).await
    }

    pub async fn temperature(&self) -> ReadOutcome {
        self.read(portless(Channel::Temperature)).await
    }

    pub async fn wifi(&self) -> ReadOutcome {
        self.read(portless(Channel::Wifi)).await
    }

    pub async fn button(&self, port: u16) -> ReadOutcome {
        self.read(ported(Channel::Button, port)).await
    }

    pub async fn input(&self, port: u16) -> ReadOutcome {
        self.read(ported(Channel::Input, port)).await
    }
}

fn portless(channel: Channel) -> SensorRequest {
    SensorRequest {
        channel,
        port: None,
    }
}

fn ported(channel: Channel, port: u16) -> SensorRequest {
    SensorRequest {
        channel,
        port: Some(port),
    }
}
