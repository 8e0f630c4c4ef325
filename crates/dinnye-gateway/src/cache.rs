//! [`ChannelCache`] – last observed value per channel with a freshness window.
//!
//! One slot per declared [`Channel`]; slots are never added or removed, only
//! overwritten.  A slot holds the value *and* its timestamp in a single
//! `Option<Observation>`, so both are always replaced together.
//!
//! Timestamps use [`tokio::time::Instant`] so a paused test clock drives
//! expiry deterministically.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dinnye_types::{Channel, SensorValue};
use tokio::time::Instant;

/// A successful reading and when it was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub observed_at: Instant,
    pub value: SensorValue,
}

/// Per-channel short-TTL cache, owned by one gateway instance.
#[derive(Debug)]
pub struct ChannelCache {
    ttl: Duration,
    slots: Mutex<[Option<Observation>; Channel::COUNT]>,
}

impl ChannelCache {
    /// Create a cache with every slot empty.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(Default::default()),
        }
    }

    /// The cached value for `channel` if it was observed strictly less than
    /// the TTL before `now`.
    pub fn fresh(&self, channel: Channel, now: Instant) -> Option<SensorValue> {
        self.lock()[channel.index()]
            .as_ref()
            .filter(|o| now.saturating_duration_since(o.observed_at) < self.ttl)
            .map(|o| o.value.clone())
    }

    /// The last observation for `channel`, fresh or not.
    pub fn last(&self, channel: Channel) -> Option<Observation> {
        self.lock()[channel.index()].clone()
    }

    /// Replace the observation for `channel`.
    pub fn record(&self, channel: Channel, value: SensorValue, observed_at: Instant) {
        self.lock()[channel.index()] = Some(Observation { observed_at, value });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, [Option<Observation>; Channel::COUNT]> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn empty_cache_has_nothing_fresh() {
        let cache = ChannelCache::new(TTL);
        for channel in Channel::ALL {
            assert_eq!(cache.fresh(channel, Instant::now()), None);
            assert_eq!(cache.last(channel), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn value_is_fresh_strictly_inside_ttl() {
        let cache = ChannelCache::new(TTL);
        let t0 = Instant::now();
        cache.record(Channel::Distance, SensorValue::Integer(120), t0);

        assert_eq!(cache.fresh(Channel::Distance, t0), Some(SensorValue::Integer(120)));
        assert_eq!(
            cache.fresh(Channel::Distance, t0 + Duration::from_millis(99)),
            Some(SensorValue::Integer(120))
        );
        assert_eq!(cache.fresh(Channel::Distance, t0 + TTL), None);
        assert_eq!(cache.fresh(Channel::Distance, t0 + Duration::from_secs(5)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_still_the_last_observation() {
        let cache = ChannelCache::new(TTL);
        let t0 = Instant::now();
        cache.record(Channel::Voltage, SensorValue::Float(3.7), t0);
        let last = cache.last(Channel::Voltage).unwrap();
        assert_eq!(last.observed_at, t0);
        assert_eq!(last.value, SensorValue::Float(3.7));
        assert_eq!(cache.fresh(Channel::Voltage, t0 + Duration::from_secs(1)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn channels_do_not_share_slots() {
        let cache = ChannelCache::new(TTL);
        let t0 = Instant::now();
        cache.record(Channel::Button, SensorValue::Boolean(true), t0);
        assert_eq!(cache.fresh(Channel::Input, t0), None);
        assert_eq!(cache.fresh(Channel::Button, t0), Some(SensorValue::Boolean(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn record_overwrites_value_and_timestamp_together() {
        let cache = ChannelCache::new(TTL);
        let t0 = Instant::now();
        cache.record(Channel::Wifi, SensorValue::Integer(-60), t0);
        let t1 = t0 + Duration::from_millis(500);
        cache.record(Channel::Wifi, SensorValue::Integer(-42), t1);
        assert_eq!(
            cache.last(Channel::Wifi),
            Some(Observation {
                observed_at: t1,
                value: SensorValue::Integer(-42)
            })
        );
    }
}
