//! `dinnye-transport` – how the gateway reaches a DINNYE board.
//!
//! The gateway never speaks HTTP directly.  It calls the [`Transport`]
//! capability: one GET with an enforced timeout, returning the response text
//! or a [`TransportError`].
//!
//! # Modules
//!
//! - [`transport`] – the [`Transport`] trait and [`TransportError`].
//! - [`http`] – [`HttpTransport`][http::HttpTransport], the `reqwest`-backed
//!   implementation used against real boards.
//! - [`sim`] – [`SimBoard`][sim::SimBoard], an in-process board that speaks
//!   the same REST dialect for headless runs and tests.
//! - `scripted` – `ScriptedTransport`, a test double that replays canned
//!   replies and records every URL.  Only built with the `test-util` feature.

pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod sim;
pub mod transport;

pub use http::HttpTransport;
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{ScriptedReply, ScriptedTransport};
pub use sim::SimBoard;
pub use transport::{Transport, TransportError};
