//! Model capabilities and the characteristics they expose.

use serde::{Deserialize, Serialize};

use crate::accessory::Characteristic;
use crate::types::Kelvin;

/// Color temperature range (Kelvin) a model honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KelvinRange {
    pub min: u16,
    pub max: u16,
}

impl Default for KelvinRange {
    fn default() -> Self {
        KelvinRange {
            min: 2500,
            max: 9000,
        }
    }
}

impl KelvinRange {
    /// Pull a temperature into this range.
    ///
    /// ```
    /// use lifx_lan_bridge::{Kelvin, KelvinRange};
    ///
    /// let range = KelvinRange { min: 2700, max: 6500 };
    /// assert_eq!(range.clamp(Kelvin::create(9000).unwrap()).kelvin(), 6500);
    /// ```
    pub fn clamp(&self, kelvin: Kelvin) -> Kelvin {
        Kelvin {
            kelvin: kelvin.kelvin().clamp(self.min, self.max),
        }
    }

    /// Range in mireds as `(min, max)`; the warm end is the larger value.
    pub fn mired_bounds(&self) -> (u16, u16) {
        (
            Kelvin { kelvin: self.max }.mired(),
            Kelvin { kelvin: self.min }.mired(),
        )
    }
}

/// Feature set of a bulb model.
///
/// Immutable once resolved from hardware info. The default is the
/// conservative white-only profile used until resolution succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub color: bool,
    pub ambient_light: bool,
    pub kelvin_range: KelvinRange,
}

impl Capabilities {
    /// Derive capabilities from a product name such as "LIFX Color 1000".
    ///
    /// Ambient light sensing cannot be told from the name; transports that
    /// know better set it themselves.
    ///
    /// ```
    /// use lifx_lan_bridge::Capabilities;
    ///
    /// assert!(Capabilities::from_product_name("LIFX Color 1000").color);
    /// assert!(Capabilities::from_product_name("LIFX Original 1000").color);
    /// assert!(!Capabilities::from_product_name("LIFX White 800").color);
    /// ```
    pub fn from_product_name(product: &str) -> Self {
        let words: Vec<&str> = product.split_whitespace().collect();
        let has = |w: &str| words.iter().any(|word| word.eq_ignore_ascii_case(w));

        let color = has("Color")
            || has("Original")
            || has("Z")
            || has("Beam")
            || has("Tile")
            || has("Candle")
            || product.contains('+');

        let kelvin_range = if has("Day") && has("Dusk") {
            KelvinRange {
                min: 1500,
                max: 4000,
            }
        } else if has("White") && !color {
            KelvinRange {
                min: 2700,
                max: 6500,
            }
        } else {
            KelvinRange::default()
        };

        Capabilities {
            color,
            ambient_light: false,
            kelvin_range,
        }
    }

    /// The characteristics an accessory with these capabilities exposes.
    ///
    /// Every bulb gets power, brightness and both temperature forms; color
    /// models add hue and saturation, sensing models add the light level.
    pub fn characteristics(&self) -> Vec<Characteristic> {
        let mut list = vec![
            Characteristic::On,
            Characteristic::Brightness,
            Characteristic::Kelvin,
            Characteristic::ColorTemperature,
        ];
        if self.color {
            list.push(Characteristic::Hue);
            list.push(Characteristic::Saturation);
        }
        if self.ambient_light {
            list.push(Characteristic::AmbientLightLevel);
        }
        list
    }
}

/// Hardware description reported by a bulb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub vendor: String,
    pub model: String,
    pub capabilities: Capabilities,
}

impl HardwareInfo {
    /// Build from vendor and product names, deriving capabilities from the
    /// product name.
    pub fn from_names(vendor: &str, model: &str) -> Self {
        HardwareInfo {
            vendor: vendor.to_string(),
            model: model.to_string(),
            capabilities: Capabilities::from_product_name(model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_white_only() {
        let caps = Capabilities::default();
        assert!(!caps.color);
        assert!(!caps.ambient_light);
        assert_eq!(caps.kelvin_range, KelvinRange { min: 2500, max: 9000 });
        assert!(!caps.characteristics().contains(&Characteristic::Hue));
    }

    #[test]
    fn test_color_model_exposes_hue_and_saturation() {
        let chars = Capabilities::from_product_name("LIFX Color 1000").characteristics();
        assert!(chars.contains(&Characteristic::Hue));
        assert!(chars.contains(&Characteristic::Saturation));
        assert!(!chars.contains(&Characteristic::AmbientLightLevel));
    }

    #[test]
    fn test_ambient_light_characteristic() {
        let caps = Capabilities {
            ambient_light: true,
            ..Capabilities::default()
        };
        assert!(caps.characteristics().contains(&Characteristic::AmbientLightLevel));
    }

    #[test]
    fn test_day_and_dusk_range() {
        let caps = Capabilities::from_product_name("LIFX Mini Day and Dusk");
        assert!(!caps.color);
        assert_eq!(caps.kelvin_range, KelvinRange { min: 1500, max: 4000 });
    }

    #[test]
    fn test_mired_bounds() {
        assert_eq!(KelvinRange::default().mired_bounds(), (111, 400));
    }
}
