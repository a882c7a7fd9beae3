//! devtrack - per-endpoint network activity accounting
//!
//! Tracks which endpoints connect through tagged listeners, how often, and
//! how many bytes they move, and persists the aggregates to monthly
//! fixed-width report files.
//!
//! A host embeds this as a library: it builds a [`TrackerRouter`], registers
//! a [`DeviceTracker`] per listener tag and feeds its accept and accounting
//! callbacks through [`ActivityHooks`]. Each tracker flushes its registry to
//! disk on a background interval and rotates the report file at calendar
//! month boundaries.

pub mod config;
pub mod events;
pub mod registry;
pub mod report;
pub mod router;
pub mod tracker;

// Re-export commonly used types
pub use config::TrackerConfig;
pub use events::{ActivityEvent, ActivityHooks};
pub use registry::{DeviceRecord, DeviceRegistry, RetentionPolicy};
pub use router::TrackerRouter;
pub use tracker::DeviceTracker;
