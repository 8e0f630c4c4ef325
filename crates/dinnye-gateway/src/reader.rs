//! [`SensorReader`] – the two-phase trigger/fetch read protocol.
//!
//! The board has one shared "last sample" register rather than an endpoint
//! per sensor, so every live read is an *exchange*:
//!
//! 1. GET the channel's sample command (body discarded).
//! 2. Wait the settling delay, whether or not step 1 succeeded.
//! 3. GET the shared response endpoint.
//! 4. Coerce the body into the channel's domain and record it in the
//!    [`ChannelCache`].
//!
//! Reads landing inside the cache TTL skip the exchange entirely.  Reads of
//! the same board and request that miss the cache at the same time await a
//! single exchange instead of each starting their own.  The exchange runs on
//! its own task, so it completes even if every caller stops waiting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dinnye_transport::TransportError;
use dinnye_types::{ResultDomain, SensorRequest, SensorValue};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, warn};

use crate::binding::BoardBinding;
use crate::cache::ChannelCache;
use crate::coerce::{CoerceError, coerce};
use crate::device::DeviceLink;

// ─────────────────────────────────────────────────────────────────────────────
// Outcome types
// ─────────────────────────────────────────────────────────────────────────────

/// Why a live read produced no value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("sample trigger failed: {0}")]
    Trigger(TransportError),

    #[error("response fetch failed: {0}")]
    Fetch(TransportError),

    #[error("unexpected sensor response: {0}")]
    Coerce(#[from] CoerceError),

    #[error("exchange task aborted: {0}")]
    Aborted(String),
}

/// Result of one read, as seen by a typed caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// No board bound; nothing was done.
    Unbound,
    /// Served from the cache without a network call.
    Cached(SensorValue),
    /// Produced by a live exchange and now cached.
    Fresh(SensorValue),
    /// The exchange failed; the cache was left untouched.
    Failed {
        domain: ResultDomain,
        error: ReadError,
        /// The channel's previous observation, however old.
        last_known: Option<SensorValue>,
    },
}

impl ReadOutcome {
    /// The reading, if the read produced one.
    pub fn value(&self) -> Option<&SensorValue> {
        match self {
            ReadOutcome::Cached(v) | ReadOutcome::Fresh(v) => Some(v),
            ReadOutcome::Unbound | ReadOutcome::Failed { .. } => None,
        }
    }

    /// Collapse to what a block host renders: no value while unbound, the
    /// reading on success, the domain sentinel on failure.
    pub fn into_reporter(self) -> Option<SensorValue> {
        match self {
            ReadOutcome::Unbound => None,
            ReadOutcome::Cached(v) | ReadOutcome::Fresh(v) => Some(v),
            ReadOutcome::Failed { domain, .. } => Some(SensorValue::sentinel(domain)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SensorReader
// ─────────────────────────────────────────────────────────────────────────────

type ExchangeResult = Result<SensorValue, ReadError>;
type SharedExchange = Shared<BoxFuture<'static, ExchangeResult>>;
type ExchangeKey = (String, SensorRequest);
type InFlight = Mutex<HashMap<ExchangeKey, (u64, SharedExchange)>>;

/// State an exchange task needs after the caller has gone away.
struct ExchangeContext {
    link: DeviceLink,
    cache: Arc<ChannelCache>,
    settling_delay: Duration,
    /// Present when exchanges must not overlap on the shared sample register.
    register_lock: Option<tokio::sync::Mutex<()>>,
    in_flight: InFlight,
}

/// Runs reads against the bound board, consulting and updating the cache.
///
/// Must be polled from within a Tokio runtime: cache misses spawn the
/// exchange as a task.
pub struct SensorReader {
    binding: Arc<BoardBinding>,
    ctx: Arc<ExchangeContext>,
    next_exchange: AtomicU64,
}

impl SensorReader {
    pub fn new(
        binding: Arc<BoardBinding>,
        link: DeviceLink,
        cache: Arc<ChannelCache>,
        settling_delay: Duration,
        exclusive_exchange: bool,
    ) -> Self {
        Self {
            binding,
            ctx: Arc::new(ExchangeContext {
                link,
                cache,
                settling_delay,
                register_lock: exclusive_exchange.then(|| tokio::sync::Mutex::new(())),
                in_flight: Mutex::new(HashMap::new()),
            }),
            next_exchange: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &ChannelCache {
        &self.ctx.cache
    }

    /// Read `request` from the bound board.
    pub async fn read(&self, request: SensorRequest) -> ReadOutcome {
        let Some(board) = self.binding.current() else {
            debug!(%request, "no board bound; read skipped");
            return ReadOutcome::Unbound;
        };

        let channel = request.channel;
        if let Some(value) = self.ctx.cache.fresh(channel, Instant::now()) {
            debug!(%request, %value, "served from cache");
            return ReadOutcome::Cached(value);
        }

        match self.join_or_start(board, request).await {
            Ok(value) => ReadOutcome::Fresh(value),
            Err(error) => ReadOutcome::Failed {
                domain: channel.domain(),
                error,
                last_known: self.ctx.cache.last(channel).map(|o| o.value),
            },
        }
    }

    /// Number of exchanges still running.
    pub fn in_flight(&self) -> usize {
        lock(&self.ctx.in_flight).len()
    }

    fn join_or_start(&self, board: String, request: SensorRequest) -> SharedExchange {
        let key = (board, request);
        let mut in_flight = lock(&self.ctx.in_flight);
        // A finished entry is left behind only by a task that panicked.
        if let Some((_, running)) = in_flight.get(&key).filter(|(_, e)| e.peek().is_none()) {
            return running.clone();
        }

        let id = self.next_exchange.fetch_add(1, Ordering::Relaxed);
        let ctx = Arc::clone(&self.ctx);
        let task_key = key.clone();
        let span = debug_span!("exchange", board = %key.0, %request);
        let task = tokio::spawn(
            async move {
                let result = ctx.exchange(&task_key.0, request).await;
                ctx.retire(&task_key, id);
                result
            }
            .instrument(span),
        );
        let exchange = async move {
            task.await
                .unwrap_or_else(|e| Err(ReadError::Aborted(e.to_string())))
        }
        .boxed()
        .shared();
        in_flight.insert(key, (id, exchange.clone()));
        exchange
    }
}

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<ExchangeKey, (u64, SharedExchange)>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ExchangeContext {
    /// Drop the map entry for `key` if it still belongs to exchange `id`.
    fn retire(&self, key: &ExchangeKey, id: u64) {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.get(key).is_some_and(|(current, _)| *current == id) {
            in_flight.remove(key);
        }
    }

    async fn exchange(&self, board: &str, request: SensorRequest) -> ExchangeResult {
        let _register = match &self.register_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let trigger = self.link.get(&self.link.sample_url(board, &request)).await;
        if let Err(err) = &trigger {
            warn!(%err, "sample trigger failed; fetching response anyway");
        }

        // The board needs this long to latch a sample, trigger success or not.
        tokio::time::sleep(self.settling_delay).await;

        let response = self.link.get(&self.link.response_url(board)).await;
        let body = match (trigger, response) {
            (Err(err), response) => {
                if let Err(fetch_err) = &response {
                    warn!(err = %fetch_err, "error fetching value");
                }
                return Err(ReadError::Trigger(err));
            }
            (Ok(_), Err(err)) => {
                warn!(%err, "error fetching value");
                return Err(ReadError::Fetch(err));
            }
            (Ok(_), Ok(body)) => body,
        };

        let value = coerce(request.channel.domain(), &body).inspect_err(|err| {
            warn!(%err, "sensor response not recorded");
        })?;
        self.cache.record(request.channel, value.clone(), Instant::now());
        debug!(%value, "sample recorded");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dinnye_transport::{ScriptedReply, ScriptedTransport, SimBoard};
    use dinnye_types::Channel;

    const TTL: Duration = Duration::from_millis(100);
    const SETTLE: Duration = Duration::from_millis(200);
    const TIMEOUT: Duration = Duration::from_secs(1);

    fn reader_with(transport: Arc<ScriptedTransport>, exclusive: bool) -> (Arc<BoardBinding>, SensorReader) {
        let binding = Arc::new(BoardBinding::new());
        let link = DeviceLink::new(transport, "http://b", TIMEOUT);
        let reader = SensorReader::new(
            Arc::clone(&binding),
            link,
            Arc::new(ChannelCache::new(TTL)),
            SETTLE,
            exclusive,
        );
        (binding, reader)
    }

    fn distance() -> SensorRequest {
        SensorRequest::new(Channel::Distance).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn unbound_read_makes_no_calls() {
        let transport = Arc::new(ScriptedTransport::new());
        let (_, reader) = reader_with(Arc::clone(&transport), false);
        assert_eq!(reader.read(distance()).await, ReadOutcome::Unbound);
        assert_eq!(transport.call_count(), 0);
        assert_eq!(reader.cache().last(Channel::Distance), None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_read_inside_ttl_is_served_from_cache() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("120")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        assert_eq!(
            reader.read(distance()).await,
            ReadOutcome::Fresh(SensorValue::Integer(120))
        );
        assert_eq!(
            transport.urls(),
            vec!["http://b/AB-12/command/distance", "http://b/AB-12/response"]
        );

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(
            reader.read(distance()).await,
            ReadOutcome::Cached(SensorValue::Integer(120))
        );
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn read_at_ttl_boundary_runs_a_new_exchange() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("120"))
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("95")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        reader.read(distance()).await;
        tokio::time::advance(TTL).await;
        assert_eq!(
            reader.read(distance()).await,
            ReadOutcome::Fresh(SensorValue::Integer(95))
        );
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn response_fetch_waits_for_settling_delay_after_trigger() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok").after(Duration::from_millis(30)))
                .with_reply(ScriptedReply::text("3.9")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        let outcome = reader.read(SensorRequest::new(Channel::Voltage).unwrap()).await;
        assert_eq!(outcome, ReadOutcome::Fresh(SensorValue::Float(3.9)));

        let calls = transport.calls();
        let gap = calls[1].started_at - calls[0].started_at;
        assert_eq!(gap, Duration::from_millis(30) + SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_timeout_still_fetches_but_leaves_cache_alone() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("120"))
                .with_reply(ScriptedReply::error(TransportError::Timeout))
                .with_reply(ScriptedReply::text("77")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        reader.read(distance()).await;
        let before = reader.cache().last(Channel::Distance);
        tokio::time::advance(Duration::from_millis(500)).await;

        let outcome = reader.read(distance()).await;
        assert_eq!(
            outcome,
            ReadOutcome::Failed {
                domain: ResultDomain::Integer,
                error: ReadError::Trigger(TransportError::Timeout),
                last_known: Some(SensorValue::Integer(120)),
            }
        );
        assert_eq!(transport.call_count(), 4, "response fetch must still be attempted");
        assert_eq!(transport.urls()[3], "http://b/AB-12/response");
        assert_eq!(reader.cache().last(Channel::Distance), before);
        assert_eq!(outcome.into_reporter(), Some(SensorValue::Integer(-1)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_trigger_is_bounded_then_settles() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok").after(Duration::from_secs(10)))
                .with_reply(ScriptedReply::text("on")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        let outcome = reader
            .read(SensorRequest::with_port(Channel::Button, 1).unwrap())
            .await;
        assert!(matches!(
            outcome,
            ReadOutcome::Failed {
                error: ReadError::Trigger(TransportError::Timeout),
                ..
            }
        ));
        let calls = transport.calls();
        assert_eq!(calls[1].started_at - calls[0].started_at, TIMEOUT + SETTLE);
        assert_eq!(outcome.into_reporter(), Some(SensorValue::Text(String::new())));
    }

    #[tokio::test(start_paused = true)]
    async fn response_failure_leaves_cache_alone() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::error(TransportError::Network("reset".into()))),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        let outcome = reader.read(SensorRequest::new(Channel::Gesture).unwrap()).await;
        assert_eq!(
            outcome,
            ReadOutcome::Failed {
                domain: ResultDomain::Text,
                error: ReadError::Fetch(TransportError::Network("reset".into())),
                last_known: None,
            }
        );
        assert_eq!(reader.cache().last(Channel::Gesture), None);
        assert_eq!(outcome.into_reporter(), Some(SensorValue::Text(String::new())));
    }

    #[tokio::test(start_paused = true)]
    async fn unparseable_numeric_response_is_a_failure_with_sentinel() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("garbage")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        let outcome = reader.read(SensorRequest::new(Channel::Wifi).unwrap()).await;
        assert!(matches!(
            outcome,
            ReadOutcome::Failed {
                error: ReadError::Coerce(CoerceError::NotAnInteger(_)),
                ..
            }
        ));
        assert_eq!(reader.cache().last(Channel::Wifi), None);
        assert_eq!(outcome.into_reporter(), Some(SensorValue::Integer(-1)));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_exchange() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("42")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        let (a, b) = tokio::join!(reader.read(distance()), reader.read(distance()));
        assert_eq!(a, ReadOutcome::Fresh(SensorValue::Integer(42)));
        assert_eq!(b, ReadOutcome::Fresh(SensorValue::Integer(42)));
        assert_eq!(transport.call_count(), 2);
        assert_eq!(reader.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn different_ports_are_not_coalesced() {
        let transport = Arc::new(ScriptedTransport::new().with_fallback(ScriptedReply::text("on")));
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        let one = SensorRequest::with_port(Channel::Input, 1).unwrap();
        let two = SensorRequest::with_port(Channel::Input, 2).unwrap();
        tokio::join!(reader.read(one), reader.read(two));
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_completes_even_if_caller_gives_up() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("31")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        let temperature = SensorRequest::new(Channel::Temperature).unwrap();
        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), reader.read(temperature)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(transport.call_count(), 2);
        assert_eq!(
            reader.cache().last(Channel::Temperature).map(|o| o.value),
            Some(SensorValue::Integer(31))
        );

        assert_eq!(reader.in_flight(), 0);

        // A later miss starts a fresh exchange.
        transport.push(ScriptedReply::text("ok"));
        transport.push(ScriptedReply::text("33"));
        assert_eq!(
            reader.read(temperature).await,
            ReadOutcome::Fresh(SensorValue::Integer(33))
        );
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_exchanges_leave_nothing_in_flight() {
        let transport = Arc::new(ScriptedTransport::new().with_fallback(ScriptedReply::text("on")));
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        for port in 0..200 {
            let input = SensorRequest::with_port(Channel::Input, port).unwrap();
            let abandoned =
                tokio::time::timeout(Duration::from_millis(1), reader.read(input)).await;
            assert!(abandoned.is_err());
        }
        assert!(reader.in_flight() > 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.call_count(), 400);
        assert_eq!(reader.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn both_failures_are_logged_and_trigger_error_wins() {
        let logs = Arc::new(Mutex::new(Vec::<u8>::new()));
        let sink = Arc::clone(&logs);
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || LogSink(Arc::clone(&sink)))
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::error(TransportError::Status(503)))
                .with_reply(ScriptedReply::error(TransportError::Timeout)),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), false);
        binding.bind("AB-12");

        let outcome = reader.read(distance()).await;
        assert!(matches!(
            outcome,
            ReadOutcome::Failed {
                error: ReadError::Trigger(TransportError::Status(503)),
                ..
            }
        ));

        let logged = String::from_utf8_lossy(&logs.lock().unwrap()).into_owned();
        assert!(logged.contains("sample trigger failed"), "{logged}");
        assert!(logged.contains("error fetching value"), "{logged}");
    }

    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exclusive_exchange_serialises_channels() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("120"))
                .with_reply(ScriptedReply::text("ok"))
                .with_reply(ScriptedReply::text("swipe")),
        );
        let (binding, reader) = reader_with(Arc::clone(&transport), true);
        binding.bind("AB-12");

        let (d, g) = tokio::join!(
            reader.read(distance()),
            reader.read(SensorRequest::new(Channel::Gesture).unwrap())
        );
        assert_eq!(d, ReadOutcome::Fresh(SensorValue::Integer(120)));
        assert_eq!(g, ReadOutcome::Fresh(SensorValue::Text("swipe".into())));
        let urls = transport.urls();
        assert_eq!(urls[0], "http://b/AB-12/command/distance");
        assert_eq!(urls[1], "http://b/AB-12/response");
        assert_eq!(urls[2], "http://b/AB-12/command/gesture");
        assert_eq!(urls[3], "http://b/AB-12/response");
    }

    #[tokio::test(start_paused = true)]
    async fn reads_against_simulated_board() {
        let board = Arc::new(SimBoard::new("AB-12"));
        board.update_readings(|r| {
            r.high_inputs.insert(4);
        });
        let binding = Arc::new(BoardBinding::new());
        binding.bind("AB-12");
        let reader = SensorReader::new(
            Arc::clone(&binding),
            DeviceLink::new(board, "http://sim", TIMEOUT),
            Arc::new(ChannelCache::new(TTL)),
            SETTLE,
            false,
        );

        assert_eq!(
            reader.read(SensorRequest::with_port(Channel::Input, 4).unwrap()).await,
            ReadOutcome::Fresh(SensorValue::Boolean(true))
        );
        assert_eq!(
            reader.read(SensorRequest::new(Channel::Voltage).unwrap()).await,
            ReadOutcome::Fresh(SensorValue::Float(3.7))
        );
    }
}
