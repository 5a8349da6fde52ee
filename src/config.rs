//! Platform configuration as found in the host's JSON config block.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::errors::Error;
use crate::registry::DeviceId;

type Result<T> = std::result::Result<T, Error>;

/// Options for the platform and the transport it drives.
///
/// Every field is optional in JSON; missing fields take the defaults below.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use lifx_lan_bridge::PlatformConfig;
///
/// let config = PlatformConfig::from_json(r#"{
///     "platform": "LifxLan",
///     "name": "LIFX LAN",
///     "duration": 500,
///     "ignoredDevices": ["d073d5000001"]
/// }"#).unwrap();
///
/// assert_eq!(config.fade, Duration::from_millis(500));
/// assert_eq!(config.light_offline_tolerance, 3);
/// assert!(config.is_ignored(&"d073d5000001".into()));
/// ```
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformConfig {
    pub name: String,
    /// Discovery rounds a bulb may miss before it is reported offline.
    pub light_offline_tolerance: u32,
    /// Upper bound on any single transport call.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub message_handler_timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub resend_packet_delay: Duration,
    pub resend_max_times: u32,
    pub debug: bool,
    /// Transition time passed with every power and color command.
    #[serde(rename = "duration")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub fade: Duration,
    /// Bulbs the operator excluded; events for them are dropped.
    pub ignored_devices: HashSet<DeviceId>,
    /// How long a live read satisfies later queries. Zero reads every time.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub state_ttl: Duration,
    /// Where the device cache is kept between runs.
    pub cache_path: Option<PathBuf>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig {
            name: "LIFX LAN".to_string(),
            light_offline_tolerance: 3,
            message_handler_timeout: Duration::from_millis(45_000),
            resend_packet_delay: Duration::from_millis(150),
            resend_max_times: 3,
            debug: false,
            fade: Duration::ZERO,
            ignored_devices: HashSet::new(),
            state_ttl: Duration::ZERO,
            cache_path: None,
        }
    }
}

impl PlatformConfig {
    /// Parse a platform block. Unknown keys such as `platform` are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::JsonLoad)
    }

    pub fn is_ignored(&self, id: &DeviceId) -> bool {
        self.ignored_devices.contains(id)
    }

    /// Settings the transport needs when it is initialized.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            debug: self.debug,
            light_offline_tolerance: self.light_offline_tolerance,
            message_handler_timeout: self.message_handler_timeout,
            resend_max_times: self.resend_max_times,
            resend_packet_delay: self.resend_packet_delay,
        }
    }
}

/// Client library settings forwarded from [`PlatformConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    pub debug: bool,
    pub light_offline_tolerance: u32,
    pub message_handler_timeout: Duration,
    pub resend_max_times: u32,
    pub resend_packet_delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_block_uses_defaults() {
        let config = PlatformConfig::from_json("{}").unwrap();
        assert_eq!(config.message_handler_timeout, Duration::from_secs(45));
        assert_eq!(config.resend_packet_delay, Duration::from_millis(150));
        assert_eq!(config.resend_max_times, 3);
        assert_eq!(config.state_ttl, Duration::ZERO);
        assert!(config.ignored_devices.is_empty());
        assert!(config.cache_path.is_none());
    }

    #[test]
    fn test_transport_options() {
        let config = PlatformConfig::from_json(
            r#"{"messageHandlerTimeout": 1000, "resendMaxTimes": 5, "debug": true}"#,
        )
        .unwrap();
        let opts = config.transport_options();
        assert_eq!(opts.message_handler_timeout, Duration::from_secs(1));
        assert_eq!(opts.resend_max_times, 5);
        assert!(opts.debug);
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(matches!(
            PlatformConfig::from_json(r#"{"duration": "slow"}"#),
            Err(Error::JsonLoad(_))
        ));
    }
}
