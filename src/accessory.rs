//! The accessory-bridging host and the characteristics it exposes.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::capabilities::Capabilities;
use crate::registry::DeviceId;
use crate::state::{Field, LightState};

/// A characteristic of the light bulb service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Characteristic {
    On,
    Brightness,
    Hue,
    Saturation,
    /// Vendor characteristic carrying the temperature in Kelvin.
    Kelvin,
    /// Standard color temperature, in mireds.
    ColorTemperature,
    /// Read-only light sensor level, in lux.
    AmbientLightLevel,
}

/// Value bounds of a characteristic for one device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicProps {
    pub min_value: f64,
    pub max_value: f64,
    pub min_step: f64,
    pub writable: bool,
}

impl Characteristic {
    /// UUID of the vendor Kelvin characteristic.
    pub const KELVIN_UUID: Uuid = Uuid::from_u128(0xC4E24248_04AC_44AF_ACFF_40164E829DBA);

    /// The state field backing this characteristic, if any.
    pub fn field(&self) -> Option<Field> {
        match self {
            Characteristic::On => Some(Field::Power),
            Characteristic::Brightness => Some(Field::Brightness),
            Characteristic::Hue => Some(Field::Hue),
            Characteristic::Saturation => Some(Field::Saturation),
            Characteristic::Kelvin | Characteristic::ColorTemperature => Some(Field::Kelvin),
            Characteristic::AmbientLightLevel => None,
        }
    }

    /// Bounds for a device with the given capabilities.
    ///
    /// ```
    /// use lifx_lan_bridge::{Capabilities, Characteristic};
    ///
    /// let props = Characteristic::Kelvin.props(&Capabilities::default());
    /// assert_eq!((props.min_value, props.max_value, props.min_step), (2500.0, 9000.0, 250.0));
    /// ```
    pub fn props(&self, capabilities: &Capabilities) -> CharacteristicProps {
        let range = capabilities.kelvin_range;
        let (min_value, max_value, min_step) = match self {
            Characteristic::On => (0.0, 1.0, 1.0),
            Characteristic::Brightness => (1.0, 100.0, 1.0),
            Characteristic::Hue => (0.0, 360.0, 1.0),
            Characteristic::Saturation => (0.0, 100.0, 1.0),
            Characteristic::Kelvin => (f64::from(range.min), f64::from(range.max), 250.0),
            Characteristic::ColorTemperature => {
                let (min, max) = range.mired_bounds();
                (f64::from(min), f64::from(max), 1.0)
            }
            Characteristic::AmbientLightLevel => (0.0001, 100_000.0, 0.0001),
        };
        CharacteristicProps {
            min_value,
            max_value,
            min_step,
            writable: !matches!(self, Characteristic::AmbientLightLevel),
        }
    }
}

/// A value read from or written to a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    Number(f64),
}

impl CharacteristicValue {
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            CharacteristicValue::Bool(b) => Some(b),
            CharacteristicValue::Number(n) => Some(n != 0.0),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            CharacteristicValue::Bool(_) => None,
            CharacteristicValue::Number(n) => Some(n),
        }
    }
}

/// What the host needs to publish a bulb as an accessory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryInfo {
    pub id: DeviceId,
    pub uuid: Uuid,
    pub display_name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: String,
    pub capabilities: Capabilities,
}

/// The accessory-bridging framework.
///
/// Calls are made from within registry operations and must not block.
pub trait AccessoryHost: Send + Sync + 'static {
    /// Publish a new accessory. Called once per device.
    fn register_accessory(&self, info: &AccessoryInfo);

    /// Withdraw an accessory after operator removal.
    fn unregister_accessory(&self, id: &DeviceId);

    /// Mark the accessory reachable and route get/set for the listed
    /// characteristics to the platform, seeding them with `state`.
    fn bind(&self, id: &DeviceId, characteristics: &[Characteristic], state: &LightState);

    /// Mark the accessory unreachable and drop every get/set listener so
    /// that requests fail fast instead of waiting on a dead connection.
    fn unbind(&self, id: &DeviceId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::KelvinRange;
    use std::str::FromStr;

    #[test]
    fn test_kelvin_uuid() {
        assert_eq!(
            Characteristic::KELVIN_UUID.to_string(),
            "c4e24248-04ac-44af-acff-40164e829dba"
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            Characteristic::from_str("color-temperature").unwrap(),
            Characteristic::ColorTemperature
        );
        assert_eq!(Characteristic::On.to_string(), "on");
    }

    #[test]
    fn test_color_temperature_follows_model_range() {
        let caps = Capabilities {
            kelvin_range: KelvinRange {
                min: 2700,
                max: 6500,
            },
            ..Capabilities::default()
        };
        let props = Characteristic::ColorTemperature.props(&caps);
        assert_eq!((props.min_value, props.max_value), (154.0, 370.0));
        assert!(props.writable);
        assert!(!Characteristic::AmbientLightLevel.props(&caps).writable);
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(CharacteristicValue::Number(1.0).as_bool(), Some(true));
        assert_eq!(CharacteristicValue::Bool(true).as_f64(), None);
    }
}
