//! Message bus collaborator.
//! One `tokio::sync::broadcast` channel per named bus channel, behind a
//! `MessageBus` trait so the in-process broadcast implementation can later
//! be swapped for a real pub/sub backend.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

pub const CHANNEL_PRICES: &str = "prices";
pub const CHANNEL_SENTIMENT: &str = "sentiment";
pub const CHANNEL_EVENTS: &str = "events";
pub const CHANNEL_INDICATORS: &str = "indicators";
pub const CHANNEL_REGIME: &str = "regime";
pub const CHANNEL_SIGNALS: &str = "signals";
pub const CHANNEL_ORDER_UPDATES: &str = "orders.updates";
pub const CHANNEL_ALERTS: &str = "alerts";

const DEFAULT_CAPACITY: usize = 1024;

pub trait MessageBus: Send + Sync {
    fn publish(&self, channel: &str, payload: Value);
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Value>;
}

/// In-process bus. Channels are created lazily on first publish or
/// subscribe and never torn down for the life of the process.
pub struct InMemoryBus {
    channels: Mutex<HashMap<String, broadcast::Sender<Value>>>,
    capacity: usize,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` is the per-channel buffer depth (`bus_buffer_capacity`):
    /// a slow subscriber that falls this far behind the publisher starts
    /// missing messages rather than blocking it.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { channels: Mutex::new(HashMap::new()), capacity }
    }

    fn sender_for(&self, channel: &str) -> broadcast::Sender<Value> {
        let mut channels = self.channels.lock();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for InMemoryBus {
    fn publish(&self, channel: &str, payload: Value) {
        let sender = self.sender_for(channel);
        // No active subscribers is a normal state (e.g. nothing has started
        // listening yet), not a failure worth propagating.
        let _ = sender.send(payload);
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Value> {
        self.sender_for(channel).subscribe()
    }
}
