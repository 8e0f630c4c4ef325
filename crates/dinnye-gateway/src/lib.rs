//! `dinnye-gateway` – client-side gateway to a DINNYE board.
//!
//! Lets a block-based visual program drive the board's actuators and read
//! its sensors over the board's stateless REST interface.
//!
//! # Modules
//!
//! - [`binding`] – [`BoardBinding`]: the board id every call is addressed
//!   to.  Nothing happens until one is bound.
//! - [`dispatcher`] – [`CommandDispatcher`]: fire-and-forget actuator
//!   commands on spawned tasks; outcomes are only logged.
//! - [`reader`] – [`SensorReader`]: the trigger, settle, fetch exchange,
//!   with concurrent identical reads sharing one exchange.
//! - [`cache`] – [`ChannelCache`]: last value per channel, served for a
//!   short TTL without touching the board.
//! - [`coerce`] – raw response text to a typed [`SensorValue`][dinnye_types::SensorValue].
//! - [`device`] – [`DeviceLink`][device::DeviceLink]: URL templates and
//!   timeout-bounded GETs.
//! - [`gateway`] – [`Gateway`]: the facade tying the above together.
//! - [`host`] – the block catalog and [`Gateway::invoke`] for hosts that
//!   pass JSON argument bags.
//! - [`config`] – [`GatewayConfig`].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dinnye_gateway::{Gateway, GatewayConfig};
//! use dinnye_transport::SimBoard;
//! use dinnye_types::SensorValue;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gateway = Gateway::new(GatewayConfig::default(), Arc::new(SimBoard::new("AB-12")));
//! gateway.bind("AB-12");
//! assert_eq!(gateway.distance().await.value(), Some(&SensorValue::Integer(120)));
//! # }
//! ```

pub mod binding;
pub mod cache;
pub mod coerce;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod gateway;
pub mod host;
pub mod reader;
pub mod telemetry;

pub use binding::BoardBinding;
pub use cache::{ChannelCache, Observation};
pub use coerce::CoerceError;
pub use config::GatewayConfig;
pub use dispatcher::CommandDispatcher;
pub use gateway::Gateway;
pub use host::{ArgBag, BlockCatalog, catalog};
pub use reader::{ReadError, ReadOutcome, SensorReader};
pub use telemetry::{TracerProviderGuard, init_tracing};
