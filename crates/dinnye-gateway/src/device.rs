//! [`DeviceLink`] – URL templates and bounded GETs against one board server.
//!
//! | Call | URL |
//! |---|---|
//! | actuator command | `<base>/<board>/command/<op>[/<port>]/<value>` |
//! | sample trigger | `<base>/<board>/command/<channel>[/<port>]` |
//! | response fetch | `<base>/<board>/response` |

use std::sync::Arc;
use std::time::Duration;

use dinnye_transport::{Transport, TransportError};
use dinnye_types::{DeviceCommand, SensorRequest};

/// Shared handle on the transport plus the addressing and timeout policy.
#[derive(Clone)]
pub struct DeviceLink {
    transport: Arc<dyn Transport>,
    base_url: String,
    timeout: Duration,
}

impl DeviceLink {
    pub fn new(transport: Arc<dyn Transport>, base_url: &str, timeout: Duration) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn command_url(&self, board: &str, command: &DeviceCommand) -> String {
        format!("{}/{}/command/{}", self.base_url, board, command)
    }

    pub fn sample_url(&self, board: &str, request: &SensorRequest) -> String {
        format!("{}/{}/command/{}", self.base_url, board, request)
    }

    pub fn response_url(&self, board: &str) -> String {
        format!("{}/{}/response", self.base_url, board)
    }

    /// One GET, bounded by the link timeout even if the transport ignores it.
    pub async fn get(&self, url: &str) -> Result<String, TransportError> {
        tokio::time::timeout(self.timeout, self.transport.fetch(url, self.timeout))
            .await
            .unwrap_or(Err(TransportError::Timeout))
    }
}
