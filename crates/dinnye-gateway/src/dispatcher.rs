//! [`CommandDispatcher`] – fire-and-forget actuator commands.
//!
//! A command is one GET to `<base>/<board>/command/<op>/<args...>`.  The
//! caller never waits: the request runs on a spawned task and its outcome
//! (the ack body or the transport error) is only logged.  Commands issued
//! back to back are independent requests with no ordering guarantee.

use std::sync::Arc;

use dinnye_transport::TransportError;
use dinnye_types::DeviceCommand;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::binding::BoardBinding;
use crate::device::DeviceLink;

pub struct CommandDispatcher {
    binding: Arc<BoardBinding>,
    link: DeviceLink,
}

impl CommandDispatcher {
    pub fn new(binding: Arc<BoardBinding>, link: DeviceLink) -> Self {
        Self { binding, link }
    }

    /// Issue `command` to the bound board without waiting for the result.
    ///
    /// Returns `false` when nothing was sent: no board is bound, or there is
    /// no Tokio runtime to run the request on.
    pub fn dispatch(&self, command: DeviceCommand) -> bool {
        let Some(board) = self.binding.current() else {
            debug!(%command, "no board bound; command dropped");
            return false;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!(%command, "no async runtime; command dropped");
            return false;
        };

        let link = self.link.clone();
        handle.spawn(async move { deliver(&link, &board, &command).await });
        true
    }

    /// Issue `command` and wait for its outcome.  `None` while unbound.
    pub async fn send(&self, command: &DeviceCommand) -> Option<Result<String, TransportError>> {
        let board = self.binding.current()?;
        Some(deliver(&self.link, &board, command).await)
    }
}

async fn deliver(
    link: &DeviceLink,
    board: &str,
    command: &DeviceCommand,
) -> Result<String, TransportError> {
    let url = link.command_url(board, command);
    let result = link.get(&url).await;
    match &result {
        Ok(body) => warn!(%board, %command, %body, "command acknowledged"),
        Err(err) => warn!(%board, %command, %err, "command failed"),
    }
    result
}
