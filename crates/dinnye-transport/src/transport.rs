//! The transport capability.
//!
//! Every implementation performs a single HTTP GET bounded by `timeout`.
//! Implementations must not retry; the gateway treats every failure as
//! transient and final for that call.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single transport call.
///
/// `Clone` so one failed exchange can be handed to every coalesced reader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection-level failure (refused, reset, DNS, body decode, …).
    #[error("network error: {0}")]
    Network(String),
    /// The board answered with a non-success HTTP status.
    #[error("board returned HTTP {0}")]
    Status(u16),
}

/// A way to issue one GET against a board.
///
/// # Contract
///
/// * `fetch` returns the full response body as text on a 2xx response.
/// * A call that exceeds `timeout` yields [`TransportError::Timeout`].
/// * No retries, no caching.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`, waiting at most `timeout`.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, TransportError>;
}
