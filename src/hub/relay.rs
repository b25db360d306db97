//! Telemetry Hub
//!
//! Owns the subscriber set and fans every accepted reading out to it.
//!
//! Each subscriber gets a bounded queue. Broadcasting takes a snapshot of
//! the queue senders under a read lock, then enqueues with `try_send`
//! outside the lock, so a slow subscriber can neither block the producer nor
//! hold up the other subscribers. A full queue drops the reading for that
//! subscriber only; a closed queue removes the subscriber from the set.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use uuid::Uuid;

use super::error::{DeliveryFailure, HubResult};
use super::reading::Reading;

/// Unique identifier for a subscriber connection
pub type ConnectionId = Uuid;

/// Connection ID → sending half of that subscriber's queue
type SubscriberSet = HashMap<ConnectionId, mpsc::Sender<Reading>>;

/// Configuration for the telemetry hub
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Readings buffered per subscriber before new ones are dropped for it
    pub subscriber_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 256,
        }
    }
}

/// Acknowledgment returned to connectionless producers
///
/// Means the reading was accepted and fan-out was initiated, not that any
/// subscriber has consumed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Subscribers the reading was offered to
    pub recipients: usize,
    /// Acceptance time in milliseconds since the Unix epoch
    pub accepted_at: i64,
}

/// Outcome of a single fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Members of the subscriber set when the snapshot was taken
    pub recipients: usize,
    /// Readings enqueued successfully
    pub delivered: usize,
    /// Dropped because the subscriber's queue was full
    pub lagging: usize,
    /// Dropped because the subscriber had already gone away
    pub closed: usize,
}

/// Point-in-time hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub readings_broadcast: u64,
    pub deliveries: u64,
    pub deliveries_dropped: u64,
}

impl fmt::Display for HubStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} connections ({} opened, {} closed), {} readings, {} deliveries, {} dropped",
            self.connections,
            self.connections_opened,
            self.connections_closed,
            self.readings_broadcast,
            self.deliveries,
            self.deliveries_dropped
        )
    }
}

#[derive(Default)]
struct Counters {
    opened: AtomicU64,
    closed: AtomicU64,
    readings: AtomicU64,
    deliveries: AtomicU64,
    dropped: AtomicU64,
}

/// The real-time relay between producers and subscribers
///
/// Create one per server and share it behind an `Arc`; independent hubs do
/// not see each other's subscribers.
pub struct TelemetryHub {
    subscribers: Arc<RwLock<SubscriberSet>>,
    counters: Arc<Counters>,
    config: HubConfig,
}

impl TelemetryHub {
    /// Create a new, empty hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
            config,
        }
    }

    /// Register a new subscriber
    ///
    /// The returned [`Subscription`] receives every reading broadcast from
    /// now until it is closed or dropped. Nothing broadcast earlier is
    /// replayed.
    pub fn connect(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer.max(1));
        let id = Uuid::new_v4();

        write_set(&self.subscribers).insert(id, tx);
        self.counters.opened.fetch_add(1, Ordering::Relaxed);

        tracing::info!(connection_id = %id, "Subscriber connected");

        Subscription {
            id,
            receiver: rx,
            registry: Arc::downgrade(&self.subscribers),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Remove a subscriber from the set
    ///
    /// Idempotent: returns `false` if the connection was not a member. The
    /// subscriber observes the disconnect as the end of its receive stream.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        remove_member(&self.subscribers, &self.counters, id)
    }

    /// A reading submitted over an open duplex connection
    ///
    /// The originating connection is a broadcast target like any other and
    /// receives its own reading back.
    pub fn ingest_via_channel(&self, from: &ConnectionId, reading: Reading) -> BroadcastReport {
        tracing::trace!(connection_id = %from, "Reading received over channel");
        self.broadcast(&reading)
    }

    /// A one-shot reading with no subscriber state attached to the caller
    pub fn ingest_via_request(&self, reading: Reading) -> Ack {
        let accepted_at = Utc::now().timestamp_millis();
        let report = self.broadcast(&reading);

        Ack {
            recipients: report.recipients,
            accepted_at,
        }
    }

    /// Parse a raw request payload and ingest it
    ///
    /// Anything that is not a JSON object is rejected before broadcast.
    pub fn ingest_request_body(&self, body: &[u8]) -> HubResult<Ack> {
        let reading = Reading::from_slice(body)?;
        Ok(self.ingest_via_request(reading))
    }

    /// Offer `reading` to every current subscriber
    pub(crate) fn broadcast(&self, reading: &Reading) -> BroadcastReport {
        let targets: Vec<(ConnectionId, mpsc::Sender<Reading>)> = read_set(&self.subscribers)
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut report = BroadcastReport {
            recipients: targets.len(),
            ..Default::default()
        };
        let mut gone = Vec::new();

        for (id, tx) in targets {
            match deliver(&tx, reading) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryFailure::Lagging) => {
                    report.lagging += 1;
                    tracing::warn!(
                        connection_id = %id,
                        error = %DeliveryFailure::Lagging,
                        "Delivery failed"
                    );
                }
                Err(DeliveryFailure::Closed) => {
                    report.closed += 1;
                    tracing::debug!(
                        connection_id = %id,
                        error = %DeliveryFailure::Closed,
                        "Delivery failed"
                    );
                    gone.push(id);
                }
            }
        }

        for id in &gone {
            remove_member(&self.subscribers, &self.counters, id);
        }

        self.counters.readings.fetch_add(1, Ordering::Relaxed);
        self.counters
            .deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.counters
            .dropped
            .fetch_add((report.lagging + report.closed) as u64, Ordering::Relaxed);

        if report.recipients > 0 {
            tracing::trace!(
                subscribers = report.recipients,
                delivered = report.delivered,
                "Broadcast reading"
            );
        }

        report
    }

    /// Get the current connection count
    pub fn connection_count(&self) -> usize {
        read_set(&self.subscribers).len()
    }

    /// Check whether a connection is still a member of the subscriber set
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        read_set(&self.subscribers).contains_key(id)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.connection_count(),
            connections_opened: self.counters.opened.load(Ordering::Relaxed),
            connections_closed: self.counters.closed.load(Ordering::Relaxed),
            readings_broadcast: self.counters.readings.load(Ordering::Relaxed),
            deliveries: self.counters.deliveries.load(Ordering::Relaxed),
            deliveries_dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Receiving side of one subscriber connection
///
/// Dropping it (or calling [`Subscription::close`]) removes the connection
/// from its hub.
pub struct Subscription {
    id: ConnectionId,
    receiver: mpsc::Receiver<Reading>,
    registry: Weak<RwLock<SubscriberSet>>,
    counters: Arc<Counters>,
}

impl Subscription {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Wait for the next reading
    ///
    /// Returns `None` once the hub has disconnected this subscriber and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<Reading> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Reading, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Disconnect explicitly
    pub fn close(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(registry) = self.registry.upgrade() {
            remove_member(&registry, &self.counters, &self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

fn deliver(tx: &mpsc::Sender<Reading>, reading: &Reading) -> Result<(), DeliveryFailure> {
    tx.try_send(reading.clone()).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryFailure::Lagging,
        TrySendError::Closed(_) => DeliveryFailure::Closed,
    })
}

fn remove_member(set: &RwLock<SubscriberSet>, counters: &Counters, id: &ConnectionId) -> bool {
    let removed = write_set(set).remove(id).is_some();
    if removed {
        counters.closed.fetch_add(1, Ordering::Relaxed);
        tracing::info!(connection_id = %id, "Subscriber disconnected");
    }
    removed
}

// A panic while holding the lock cannot leave the map half-updated, so a
// poisoned lock is still safe to use.
fn read_set(set: &RwLock<SubscriberSet>) -> RwLockReadGuard<'_, SubscriberSet> {
    set.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_set(set: &RwLock<SubscriberSet>) -> RwLockWriteGuard<'_, SubscriberSet> {
    set.write().unwrap_or_else(PoisonError::into_inner)
}
