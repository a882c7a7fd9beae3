//! Device registry for per-endpoint activity tracking.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;

/// Reserved value for the enrichment fields until a geo source fills them in.
const UNKNOWN_LOCATION: &str = "Unknown";

/// Build the identity key for an endpoint.
///
/// Identity is the exact `address:port` string. Two endpoints whose textual
/// forms collide are indistinguishable by design; the key format is part of
/// the report contract, so it is not normalized here.
pub fn device_key(address: &str, port: u16) -> String {
    format!("{}:{}", address, port)
}

/// Aggregate activity state for one observed endpoint.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Endpoint network address (textual IP)
    pub address: String,
    /// Endpoint port
    pub port: u16,
    /// Reserved enrichment field, never written by the core
    pub country: String,
    /// Reserved enrichment field, never written by the core
    pub city: String,
    /// When the endpoint was first seen
    pub first_seen: DateTime<Utc>,
    /// When the endpoint was last seen
    pub last_seen: DateTime<Utc>,
    /// Cumulative bytes from the endpoint, monotonically non-decreasing
    pub total_uplink: u64,
    /// Cumulative bytes to the endpoint, monotonically non-decreasing
    pub total_downlink: u64,
    /// Number of connection events observed
    pub connection_count: u64,
    /// Distinct protocol labels observed ("TCP", "UDP", ...)
    pub protocols: BTreeSet<String>,
    /// Distinct listener tags that produced a connection
    pub tags: BTreeSet<String>,
}

impl DeviceRecord {
    /// Create a new record for an endpoint first seen at `now`.
    pub fn new(address: &str, port: u16, now: DateTime<Utc>) -> Self {
        Self {
            address: address.to_string(),
            port,
            country: UNKNOWN_LOCATION.to_string(),
            city: UNKNOWN_LOCATION.to_string(),
            first_seen: now,
            last_seen: now,
            total_uplink: 0,
            total_downlink: 0,
            connection_count: 0,
            protocols: BTreeSet::new(),
            tags: BTreeSet::new(),
        }
    }

    /// Get the endpoint as an `address:port` string.
    pub fn endpoint(&self) -> String {
        device_key(&self.address, self.port)
    }
}

/// Retention policy for the registry.
///
/// The registry never deletes records on its own; without a bound it grows
/// for the life of the process. A bound makes eviction explicit rather than
/// hiding it behind the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep every record for the registry's lifetime (the historical behavior).
    Unbounded,
    /// Evict the records with the oldest `last_seen` once the registry
    /// exceeds `max_devices`.
    LeastRecentlySeen { max_devices: NonZeroUsize },
}

impl RetentionPolicy {
    /// Build a policy from an optional device limit. `None` and `Some(0)`
    /// both mean unbounded.
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit.and_then(NonZeroUsize::new) {
            Some(max_devices) => Self::LeastRecentlySeen { max_devices },
            None => Self::Unbounded,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::Unbounded
    }
}

/// Concurrent registry of observed endpoints.
///
/// All mutating paths take the exclusive lock, including traffic recording,
/// which only touches counters but still writes. Reads (`lookup`, `snapshot`)
/// take the shared lock and copy out, so no caller ever iterates live records
/// while holding it.
#[derive(Debug)]
pub struct DeviceRegistry {
    /// Map of identity key to device record
    devices: RwLock<HashMap<String, DeviceRecord>>,
    /// Retention policy enforced after connection inserts
    retention: RetentionPolicy,
}

impl DeviceRegistry {
    /// Create a new, unbounded registry.
    pub fn new() -> Self {
        Self::with_retention(RetentionPolicy::Unbounded)
    }

    /// Create a registry with the given retention policy.
    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Record one connection event for an endpoint.
    ///
    /// Creates the record on first sight, then updates `last_seen`, bumps the
    /// connection count and folds the protocol label and (non-empty) tag into
    /// the record's sets. Always succeeds.
    pub fn record_connection(&self, address: &str, port: u16, protocol: &str, tag: &str) {
        let now = Utc::now();
        let mut devices = self.devices.write();

        let record = devices
            .entry(device_key(address, port))
            .or_insert_with(|| DeviceRecord::new(address, port, now));

        record.last_seen = now;
        record.connection_count += 1;
        record.protocols.insert(protocol.to_string());
        if !tag.is_empty() {
            record.tags.insert(tag.to_string());
        }

        enforce_retention(&mut devices, self.retention);
    }

    /// Record a traffic delta for an endpoint.
    ///
    /// Traffic for an endpoint with no prior recorded connection is dropped:
    /// accounting assumes connection-before-traffic ordering, and an unmatched
    /// delta is expected under partial configuration, not an error.
    pub fn record_traffic(&self, address: &str, port: u16, uplink: u64, downlink: u64) {
        let mut devices = self.devices.write();
        if let Some(record) = devices.get_mut(&device_key(address, port)) {
            record.total_uplink += uplink;
            record.total_downlink += downlink;
        }
    }

    /// Get a copy of one endpoint's current aggregate state.
    pub fn lookup(&self, address: &str, port: u16) -> Option<DeviceRecord> {
        self.devices.read().get(&device_key(address, port)).cloned()
    }

    /// Check if an endpoint has a record.
    pub fn contains(&self, address: &str, port: u16) -> bool {
        self.devices.read().contains_key(&device_key(address, port))
    }

    /// Take an independent point-in-time copy of all records.
    ///
    /// The copy shares nothing with the live map and is safe to iterate
    /// without holding any lock.
    pub fn snapshot(&self) -> HashMap<String, DeviceRecord> {
        self.devices.read().clone()
    }

    /// Get the number of tracked endpoints.
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Evict least-recently-seen records until the map fits the policy.
///
/// Runs under the write lock. The record just touched carries the newest
/// `last_seen`, so it is never the eviction candidate.
fn enforce_retention(devices: &mut HashMap<String, DeviceRecord>, retention: RetentionPolicy) {
    let RetentionPolicy::LeastRecentlySeen { max_devices } = retention else {
        return;
    };

    while devices.len() > max_devices.get() {
        let oldest = devices
            .iter()
            .min_by_key(|(_, record)| record.last_seen)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                devices.remove(&key);
            }
            None => break,
        }
    }
}
