//! The device control library the registry drives.

use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::time::Duration;

use crate::capabilities::HardwareInfo;
use crate::state::StateReport;
use crate::types::{Hsbk, PowerMode};

/// Control surface of the LAN client library.
///
/// Packet framing, resends and addressing all live behind this trait; the
/// registry only forwards calls and never retries them. Every call may fail
/// with an [`io::Error`], which the registry reports as a transient failure.
pub trait Transport: Send + Sync + 'static {
    /// A live connection to one bulb. Replaced wholesale whenever the bulb
    /// comes back online, since its address may have changed.
    type Handle: Clone + Debug + Send + Sync + 'static;

    /// Read power, color and label.
    fn get_state(&self, handle: &Self::Handle)
    -> impl Future<Output = io::Result<StateReport>> + Send;

    /// Read vendor, model and capabilities.
    fn get_hardware_info(
        &self,
        handle: &Self::Handle,
    ) -> impl Future<Output = io::Result<HardwareInfo>> + Send;

    /// Read the ambient light sensor, in lux.
    fn get_ambient_light(&self, handle: &Self::Handle)
    -> impl Future<Output = io::Result<f32>> + Send;

    fn set_power(
        &self,
        handle: &Self::Handle,
        power: PowerMode,
        fade: Duration,
    ) -> impl Future<Output = io::Result<()>> + Send;

    fn set_color(
        &self,
        handle: &Self::Handle,
        color: &Hsbk,
        fade: Duration,
    ) -> impl Future<Output = io::Result<()>> + Send;
}
