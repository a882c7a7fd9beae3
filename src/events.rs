//! Activity events and the transport-facing hook adapter.

use crate::config::TrackerConfig;
use crate::router::TrackerRouter;
use std::net::SocketAddr;
use std::sync::Arc;

/// Protocol label recorded for TCP connection events.
pub const PROTOCOL_TCP: &str = "TCP";

/// Protocol label recorded for UDP session events.
pub const PROTOCOL_UDP: &str = "UDP";

/// A single unit of observed network activity, routed by listener tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    /// A new connection or session from an endpoint.
    Connection {
        address: String,
        port: u16,
        protocol: String,
        tag: String,
    },
    /// A traffic delta for an endpoint, in bytes.
    Traffic {
        address: String,
        port: u16,
        uplink: u64,
        downlink: u64,
        tag: String,
    },
}

impl ActivityEvent {
    /// Build a connection event.
    pub fn connection(address: &str, port: u16, protocol: &str, tag: &str) -> Self {
        Self::Connection {
            address: address.to_string(),
            port,
            protocol: protocol.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Build a traffic event.
    pub fn traffic(address: &str, port: u16, uplink: u64, downlink: u64, tag: &str) -> Self {
        Self::Traffic {
            address: address.to_string(),
            port,
            uplink,
            downlink,
            tag: tag.to_string(),
        }
    }

    /// Get the listener tag this event routes on.
    pub fn tag(&self) -> &str {
        match self {
            Self::Connection { tag, .. } => tag,
            Self::Traffic { tag, .. } => tag,
        }
    }

    /// Get the endpoint address this event concerns.
    pub fn address(&self) -> &str {
        match self {
            Self::Connection { address, .. } => address,
            Self::Traffic { address, .. } => address,
        }
    }

    /// Get the endpoint port this event concerns.
    pub fn port(&self) -> u16 {
        match self {
            Self::Connection { port, .. } => *port,
            Self::Traffic { port, .. } => *port,
        }
    }
}

/// Adapter from transport-level callbacks to routed activity events.
///
/// Hosts call these from their accept and accounting paths. Each hook checks
/// its tracking toggle, builds the event and hands it to the router; every
/// call is non-blocking apart from the registry lock and never returns an
/// error to the transport path.
#[derive(Debug, Clone)]
pub struct ActivityHooks {
    router: Arc<TrackerRouter>,
    track_tcp: bool,
    track_udp: bool,
    track_traffic: bool,
}

impl ActivityHooks {
    /// Create hooks that feed the given router, gated by the config toggles.
    pub fn new(router: Arc<TrackerRouter>, config: &TrackerConfig) -> Self {
        Self {
            router,
            track_tcp: config.track_tcp,
            track_udp: config.track_udp,
            track_traffic: config.track_traffic,
        }
    }

    /// Get the router behind these hooks.
    pub fn router(&self) -> &Arc<TrackerRouter> {
        &self.router
    }

    /// Report an accepted TCP connection from `peer` on the listener `tag`.
    pub fn on_tcp_connection(&self, peer: SocketAddr, tag: &str) {
        if !self.track_tcp {
            return;
        }
        let event = ActivityEvent::connection(&peer.ip().to_string(), peer.port(), PROTOCOL_TCP, tag);
        self.router.dispatch(&event);
    }

    /// Report a new UDP session from `peer` on the listener `tag`.
    pub fn on_udp_session(&self, peer: SocketAddr, tag: &str) {
        if !self.track_udp {
            return;
        }
        let event = ActivityEvent::connection(&peer.ip().to_string(), peer.port(), PROTOCOL_UDP, tag);
        self.router.dispatch(&event);
    }

    /// Report transferred byte counts for `peer` on the listener `tag`.
    pub fn on_traffic(&self, peer: SocketAddr, uplink: u64, downlink: u64, tag: &str) {
        if !self.track_traffic {
            return;
        }
        let event = ActivityEvent::traffic(&peer.ip().to_string(), peer.port(), uplink, downlink, tag);
        self.router.dispatch(&event);
    }
}
