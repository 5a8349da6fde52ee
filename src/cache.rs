//! Flat key-value cache of devices seen in earlier runs.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;
use crate::errors::Error;
use crate::registry::DeviceId;

type Result<T> = std::result::Result<T, Error>;

/// What is remembered about one device between runs.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDevice {
    pub display_name: String,
    pub address: Option<SocketAddr>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub capabilities: Option<Capabilities>,
}

/// Device id to [`CachedDevice`], stored as a single JSON object.
///
/// # Example
///
/// ```
/// use lifx_lan_bridge::{CachedDevice, DeviceCache};
///
/// let mut cache = DeviceCache::new();
/// cache.insert("d073d5000001".into(), CachedDevice {
///     display_name: "Desk".to_string(),
///     address: Some("192.168.1.20:56700".parse().unwrap()),
///     manufacturer: None,
///     model: None,
///     capabilities: None,
/// });
///
/// let json = cache.to_json().unwrap();
/// assert_eq!(DeviceCache::from_json(&json).unwrap(), cache);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceCache {
    entries: BTreeMap<DeviceId, CachedDevice>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache file; a missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No device cache at {}", path.display());
                Ok(Self::new())
            }
            Err(e) => Err(Error::io("read", e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| Error::io("write", e))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::JsonLoad)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::JsonDump)
    }

    pub fn insert(&mut self, id: DeviceId, device: CachedDevice) -> Option<CachedDevice> {
        self.entries.insert(id, device)
    }

    pub fn remove(&mut self, id: &DeviceId) -> Option<CachedDevice> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &DeviceId) -> Option<&CachedDevice> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &CachedDevice)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(DeviceId, CachedDevice)> for DeviceCache {
    fn from_iter<I: IntoIterator<Item = (DeviceId, CachedDevice)>>(iter: I) -> Self {
        DeviceCache {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CachedDevice {
        CachedDevice {
            display_name: "Kitchen".to_string(),
            address: None,
            manufacturer: Some("LIFX".to_string()),
            model: Some("LIFX Color 1000".to_string()),
            capabilities: Some(Capabilities::from_product_name("LIFX Color 1000")),
        }
    }

    #[test]
    fn test_json_is_flat_object() {
        let cache: DeviceCache = [(DeviceId::from("d1"), sample())].into_iter().collect();
        let value: serde_json::Value = serde_json::from_str(&cache.to_json().unwrap()).unwrap();
        assert_eq!(value["d1"]["displayName"], "Kitchen");
        assert!(value["d1"].get("address").is_none());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let path = std::env::temp_dir().join("lifx-lan-bridge-missing-cache.json");
        let _ = std::fs::remove_file(&path);
        assert!(DeviceCache::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!(
            "lifx-lan-bridge-cache-{}.json",
            std::process::id()
        ));
        let mut cache = DeviceCache::new();
        cache.insert("d1".into(), sample());
        cache.save(&path).unwrap();

        let loaded = DeviceCache::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.get(&"d1".into()), Some(&sample()));
    }

    #[test]
    fn test_corrupt_file() {
        assert!(matches!(
            DeviceCache::from_json("[1, 2"),
            Err(Error::JsonLoad(_))
        ));
    }
}
