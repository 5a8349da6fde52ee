//! # lifx_lan_bridge
//!
//! Mirrors LIFX bulbs found on the local network into smart-home accessories,
//! tracking each bulb's reachability as it sleeps, loses power or comes back
//! with a new address.
//!
//! The crate sits between two collaborators it does not implement:
//!
//! - a [`Transport`]: the LAN client library that discovers bulbs and talks
//!   to them, delivering presence as a stream of [`DiscoveryEvent`]s;
//! - an [`AccessoryHost`]: the bridging framework that publishes accessories
//!   and routes characteristic reads and writes back to the [`Platform`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use lifx_lan_bridge::{Characteristic, CharacteristicValue, Platform, PlatformConfig};
//!
//! async fn bridge(transport: Arc<MyTransport>, host: Arc<MyHost>) -> lifx_lan_bridge::Result<()> {
//!     let config = PlatformConfig::from_json(r#"{"name": "LIFX LAN", "duration": 300}"#)?;
//!     let platform = Arc::new(Platform::new(transport.clone(), host, config));
//!     platform.load_cache().await?;
//!
//!     // Pump presence signals in the background.
//!     let pump = Arc::clone(&platform).spawn(transport.discover());
//!
//!     // The host forwards characteristic requests:
//!     platform
//!         .set(&"d073d5000001".into(), Characteristic::On, CharacteristicValue::Bool(true))
//!         .await?;
//!     pump.await;
//!     Ok(())
//! }
//! ```
//!
//! ## Reachability
//!
//! Only discovery signals change whether a bulb is reachable. A failed read
//! or write is reported to the caller and the bulb stays online; reads fall
//! back to the last known state, and writes to an offline bulb are skipped
//! without error. See [`Registry`] for the full state machine.
//!
//! ## Runtime Selection
//!
//! This library is runtime-agnostic. Select your preferred runtime using feature flags:
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod accessory;
mod cache;
mod capabilities;
mod config;
mod discovery;
mod errors;
mod journal;
mod mutation;
mod platform;
mod registry;
mod response;
pub mod runtime;
mod state;
mod transport;
mod types;

#[cfg(test)]
mod testing;

// Re-export public API
pub use accessory::{
    AccessoryHost, AccessoryInfo, Characteristic, CharacteristicProps, CharacteristicValue,
};
pub use cache::{CachedDevice, DeviceCache};
pub use capabilities::{Capabilities, HardwareInfo, KelvinRange};
pub use config::{PlatformConfig, TransportOptions};
pub use discovery::DiscoveryEvent;
pub use errors::Error;
pub use journal::{JournalEntry, JournalSummary, Transition, TransitionJournal};
pub use mutation::Mutation;
pub use platform::Platform;
pub use registry::{DeviceId, DeviceSnapshot, Registry};
pub use response::Dispatch;
pub use state::{Field, FieldValue, LightState, StateReport};
pub use transport::Transport;
pub use types::{Brightness, Hsbk, Hue, Kelvin, PowerMode, Saturation};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
