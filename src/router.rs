//! Tag-keyed routing of activity events to tracker instances.

use crate::events::ActivityEvent;
use crate::tracker::DeviceTracker;
use anyhow::{bail, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes activity events to the tracker registered for their listener tag.
///
/// The router holds shared handles, so a tracker can be registered under
/// several tags or kept alive by the host after replacement. Dispatch clones
/// the handle out of the map first; the router lock is never held while the
/// tracker records.
#[derive(Debug, Default)]
pub struct TrackerRouter {
    /// Map of listener tag to tracker handle
    trackers: RwLock<HashMap<String, Arc<DeviceTracker>>>,
}

impl TrackerRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            trackers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tracker for a listener tag.
    ///
    /// A second registration for the same tag replaces the first. The
    /// replaced tracker keeps running; whoever owns it remains responsible
    /// for closing it.
    pub fn register(&self, tag: &str, tracker: Arc<DeviceTracker>) {
        let replaced = self.trackers.write().insert(tag.to_string(), tracker);
        if replaced.is_some() {
            debug!(tag, "replaced device tracker registration");
        } else {
            debug!(tag, "registered device tracker");
        }
    }

    /// Get the tracker registered for a tag.
    pub fn get(&self, tag: &str) -> Option<Arc<DeviceTracker>> {
        self.trackers.read().get(tag).cloned()
    }

    /// Check whether a tag has a registered tracker.
    pub fn is_registered(&self, tag: &str) -> bool {
        self.trackers.read().contains_key(tag)
    }

    /// Get the number of registered tags.
    pub fn len(&self) -> usize {
        self.trackers.read().len()
    }

    /// Check whether any tracker is registered.
    pub fn is_empty(&self) -> bool {
        self.trackers.read().is_empty()
    }

    /// Route one event to the tracker for its tag.
    ///
    /// Events whose tag has no registered tracker are dropped. Connection
    /// events land in the tracker's connection path, traffic events in its
    /// traffic path.
    pub fn dispatch(&self, event: &ActivityEvent) {
        let Some(tracker) = self.get(event.tag()) else {
            return;
        };

        match event {
            ActivityEvent::Connection {
                address,
                port,
                protocol,
                tag,
            } => tracker.record_connection(address, *port, protocol, tag),
            ActivityEvent::Traffic {
                address,
                port,
                uplink,
                downlink,
                ..
            } => tracker.record_traffic(address, *port, *uplink, *downlink),
        }
    }

    /// Close every registered tracker and empty the router.
    ///
    /// All trackers are closed even when some fail; each failure is logged
    /// and the result is a single summary error.
    pub async fn close_all(&self) -> Result<()> {
        let drained: Vec<(String, Arc<DeviceTracker>)> =
            self.trackers.write().drain().collect();

        let mut failures = 0usize;
        for (tag, tracker) in drained {
            if let Err(e) = tracker.close().await {
                warn!(tag = %tag, error = %e, "failed to close device tracker");
                failures += 1;
            }
        }

        if failures > 0 {
            bail!("{} device tracker(s) failed to close", failures);
        }
        Ok(())
    }
}
