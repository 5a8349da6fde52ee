//! Events pushed by the discovery subsystem.

use std::net::SocketAddr;

use crate::registry::DeviceId;

/// A presence signal for one bulb.
///
/// The transport delivers these as an infinite, restartable
/// [`Stream`](futures::Stream). Events for one id must be delivered in the
/// order they were observed.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent<H> {
    /// First sighting of a bulb by this discovery session.
    New {
        id: DeviceId,
        address: Option<SocketAddr>,
        handle: H,
    },
    /// A bulb answered again after being declared offline.
    Online {
        id: DeviceId,
        address: Option<SocketAddr>,
        handle: H,
    },
    /// A bulb missed enough discovery rounds to be considered gone.
    Offline { id: DeviceId },
}

impl<H> DiscoveryEvent<H> {
    pub fn id(&self) -> &DeviceId {
        match self {
            DiscoveryEvent::New { id, .. }
            | DiscoveryEvent::Online { id, .. }
            | DiscoveryEvent::Offline { id } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DiscoveryEvent::New { .. } => "new",
            DiscoveryEvent::Online { .. } => "online",
            DiscoveryEvent::Offline { .. } => "offline",
        }
    }
}
