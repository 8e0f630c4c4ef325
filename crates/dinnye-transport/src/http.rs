//! [`HttpTransport`] – `reqwest`-backed transport for physical boards.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use dinnye_transport::{HttpTransport, Transport};
//!
//! # async fn demo() {
//! let transport = HttpTransport::new();
//!
//! // Requires a board on the network – skipped in unit tests.
//! // let text = transport.fetch("http://192.168.4.1/AB-12/response", Duration::from_secs(1)).await;
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::transport::{Transport, TransportError};

/// An async HTTP client for the board's REST interface.
///
/// Construct once and share; the inner `reqwest::Client` pools connections.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-configured client (proxies, custom TLS, …).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, TransportError> {
        trace!(url, timeout_ms = timeout.as_millis() as u64, "GET");
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response.text().await.map_err(classify)
    }
}

/// Map a `reqwest` failure onto the transport taxonomy.
fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if let Some(status) = err.status() {
        TransportError::Status(status.as_u16())
    } else {
        TransportError::Network(err.to_string())
    }
}
