//! Hue and saturation components of a color.

use serde::{Deserialize, Serialize};

/// The color angle on the color wheel, 0-360 degrees.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Hue {
    pub(crate) degrees: u16,
}

impl Hue {
    const MAX: u16 = 360;

    /// Returns `None` if the angle is above 360.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::Hue;
    ///
    /// assert!(Hue::create(0).is_some());
    /// assert!(Hue::create(360).is_some());
    /// assert!(Hue::create(361).is_none());
    /// ```
    pub fn create(degrees: u16) -> Option<Self> {
        (degrees <= Self::MAX).then_some(Hue { degrees })
    }

    pub fn degrees(&self) -> u16 {
        self.degrees
    }
}

/// The intensity of the color, 0-100 percent. Zero is white.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Saturation {
    pub(crate) value: u8,
}

impl Saturation {
    const MAX: u8 = 100;

    /// Returns `None` if the value is above 100.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::Saturation;
    ///
    /// assert!(Saturation::create(100).is_some());
    /// assert!(Saturation::create(101).is_none());
    /// ```
    pub fn create(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Saturation { value })
    }

    pub fn value(&self) -> u8 {
        self.value
    }
}
