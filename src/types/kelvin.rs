//! Color temperature control.

use serde::{Deserialize, Serialize};

/// Color temperature in Kelvin.
///
/// Accepts the widest range any LAN bulb model reports (1500K to 9000K);
/// the range a given model honors is carried by
/// [`KelvinRange`](crate::KelvinRange). Lower values produce warmer light.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Kelvin {
    pub(crate) kelvin: u16,
}

impl Default for Kelvin {
    fn default() -> Self {
        Self::new()
    }
}

impl Kelvin {
    pub(crate) const MIN: u16 = 1500;
    pub(crate) const MAX: u16 = 9000;

    /// Create a new Kelvin with the default value (2500K).
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::Kelvin;
    ///
    /// assert_eq!(Kelvin::new().kelvin(), 2500);
    /// ```
    pub fn new() -> Self {
        Kelvin { kelvin: 2500 }
    }

    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Create a new Kelvin with the given value.
    ///
    /// Returns `None` if value is outside the valid range (1500-9000).
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::Kelvin;
    ///
    /// assert!(Kelvin::create(1499).is_none());
    /// assert!(Kelvin::create(2500).is_some());
    /// assert!(Kelvin::create(9000).is_some());
    /// assert!(Kelvin::create(9001).is_none());
    /// ```
    pub fn create(kelvin: u16) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&kelvin) {
            Some(Kelvin { kelvin })
        } else {
            None
        }
    }

    /// Reciprocal megakelvin, rounded to the nearest integer.
    ///
    /// ```
    /// use lifx_lan_bridge::Kelvin;
    ///
    /// assert_eq!(Kelvin::create(2500).unwrap().mired(), 400);
    /// assert_eq!(Kelvin::create(6500).unwrap().mired(), 154);
    /// ```
    pub fn mired(&self) -> u16 {
        ((1_000_000.0 / f64::from(self.kelvin)).round()) as u16
    }

    /// Converts mireds back to Kelvin, clamped to the accepted range.
    ///
    /// ```
    /// use lifx_lan_bridge::Kelvin;
    ///
    /// assert_eq!(Kelvin::from_mired(400).kelvin(), 2500);
    /// assert_eq!(Kelvin::from_mired(50).kelvin(), 9000);
    /// ```
    pub fn from_mired(mired: u16) -> Self {
        let kelvin = (1_000_000.0 / f64::from(mired.max(1))).round();
        Kelvin {
            kelvin: (kelvin.min(f64::from(Self::MAX)) as u16).max(Self::MIN),
        }
    }
}
