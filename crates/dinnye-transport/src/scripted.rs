//! [`ScriptedTransport`] – replay canned replies and record every request.
//!
//! Replies are consumed in order, one per `fetch`.  Once the script runs out
//! every further call receives the fallback reply (an empty body unless
//! changed with [`ScriptedTransport::with_fallback`]).
//!
//! Request timestamps use [`tokio::time::Instant`], so tests running under a
//! paused clock can assert on exact virtual delays between calls.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use dinnye_transport::{ScriptedReply, ScriptedTransport, Transport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = ScriptedTransport::new()
//!     .with_reply(ScriptedReply::text("ok"))
//!     .with_reply(ScriptedReply::text("120"));
//!
//! let t = Duration::from_secs(1);
//! assert_eq!(transport.fetch("http://b/AB-12/command/distance", t).await.unwrap(), "ok");
//! assert_eq!(transport.fetch("http://b/AB-12/response", t).await.unwrap(), "120");
//! assert_eq!(transport.call_count(), 2);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::transport::{Transport, TransportError};

/// One canned answer, optionally delivered after a delay.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    delay: Duration,
    result: Result<String, TransportError>,
}

impl ScriptedReply {
    /// Answer immediately with `body`.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(body.into()),
        }
    }

    /// Fail immediately with `err`.
    pub fn error(err: TransportError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(err),
        }
    }

    /// Hold the reply back for `delay` before delivering it.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request observed by the [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub url: String,
    /// When `fetch` was entered.
    pub started_at: Instant,
}

/// Test double for [`Transport`].
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: ScriptedReply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: ScriptedReply::text(""),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reply to the script.
    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        self.push(reply);
        self
    }

    /// Reply used once the script is exhausted.
    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Append a reply to the script after construction.
    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Every request seen so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// URLs of every request seen so far.
    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.url).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                url: url.to_string(),
                started_at: Instant::now(),
            });

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn replies_are_consumed_in_order_then_fallback() {
        let transport = ScriptedTransport::new()
            .with_reply(ScriptedReply::text("a"))
            .with_reply(ScriptedReply::error(TransportError::Timeout))
            .with_fallback(ScriptedReply::text("z"));

        assert_eq!(transport.fetch("u1", T).await.unwrap(), "a");
        assert_eq!(transport.fetch("u2", T).await, Err(TransportError::Timeout));
        assert_eq!(transport.fetch("u3", T).await.unwrap(), "z");
        assert_eq!(transport.fetch("u4", T).await.unwrap(), "z");
        assert_eq!(transport.urls(), vec!["u1", "u2", "u3", "u4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_waits_on_the_virtual_clock() {
        let transport =
            ScriptedTransport::new().with_reply(ScriptedReply::text("late").after(Duration::from_millis(300)));
        let start = Instant::now();
        assert_eq!(transport.fetch("u", T).await.unwrap(), "late");
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(transport.calls()[0].started_at, start);
    }

    #[tokio::test]
    async fn push_after_construction() {
        let transport = ScriptedTransport::new();
        transport.push(ScriptedReply::text("pushed"));
        assert_eq!(transport.fetch("u", T).await.unwrap(), "pushed");
        assert_eq!(transport.call_count(), 1);
    }
}
