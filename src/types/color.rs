//! Composite HSBK color.

use serde::{Deserialize, Serialize};

use super::{Brightness, Hue, Kelvin, Saturation};

/// Hue, saturation, brightness and kelvin as the LAN protocol sets them
/// together in one color command.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Hsbk {
    pub hue: Hue,
    pub saturation: Saturation,
    pub brightness: Brightness,
    pub kelvin: Kelvin,
}

impl Default for Hsbk {
    /// White at half brightness, 2500K.
    fn default() -> Self {
        Hsbk {
            hue: Hue::default(),
            saturation: Saturation::default(),
            brightness: Brightness::create_or(50),
            kelvin: Kelvin::new(),
        }
    }
}

impl Hsbk {
    /// Build from raw values, rejecting anything out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::Hsbk;
    ///
    /// let hsbk = Hsbk::create(120, 50, 80, 3500).unwrap();
    /// assert_eq!(hsbk.hue.degrees(), 120);
    /// assert!(Hsbk::create(0, 0, 0, 3500).is_none());
    /// ```
    pub fn create(hue: u16, saturation: u8, brightness: u8, kelvin: u16) -> Option<Self> {
        Some(Hsbk {
            hue: Hue::create(hue)?,
            saturation: Saturation::create(saturation)?,
            brightness: Brightness::create(brightness)?,
            kelvin: Kelvin::create(kelvin)?,
        })
    }
}
