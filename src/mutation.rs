//! Requested changes to a bulb's state.

use serde::{Deserialize, Serialize};

use crate::types::{Brightness, Hsbk, Hue, Kelvin, PowerMode, Saturation};

/// A set of changes to apply to a bulb.
///
/// Mutations are applied to the cached state optimistically and then sent to
/// the bulb: a power change becomes one power command, any color field
/// becomes one color command carrying the full merged HSBK.
///
/// # Creating Mutations
///
/// 1. **From a single attribute** using the [`From`] trait:
///    ```
///    use lifx_lan_bridge::{Mutation, PowerMode};
///    let mutation = Mutation::from(&PowerMode::On);
///    ```
///
/// 2. **Builder pattern** for combining multiple attributes:
///    ```
///    use lifx_lan_bridge::{Mutation, Brightness, Kelvin};
///    let mut mutation = Mutation::new();
///    mutation.brightness(&Brightness::create(80).unwrap());
///    mutation.kelvin(&Kelvin::create(4000).unwrap());
///    ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Mutation {
    pub(crate) power: Option<PowerMode>,
    pub(crate) hue: Option<Hue>,
    pub(crate) saturation: Option<Saturation>,
    pub(crate) brightness: Option<Brightness>,
    pub(crate) kelvin: Option<Kelvin>,
}

impl Mutation {
    /// Create a new empty mutation.
    ///
    /// At least one attribute must be set for the mutation to be valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::Mutation;
    ///
    /// let mutation = Mutation::new();
    /// assert_eq!(mutation.is_valid(), false);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if this mutation contains at least one attribute.
    pub fn is_valid(&self) -> bool {
        self.power.is_some() || self.has_color()
    }

    /// Whether any HSBK component is set.
    pub fn has_color(&self) -> bool {
        self.hue.is_some()
            || self.saturation.is_some()
            || self.brightness.is_some()
            || self.kelvin.is_some()
    }

    /// Set the power state.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::{Mutation, PowerMode};
    ///
    /// let mut mutation = Mutation::new();
    /// mutation.power(&PowerMode::On);
    /// assert_eq!(mutation.is_valid(), true);
    /// assert_eq!(mutation.has_color(), false);
    /// ```
    pub fn power(&mut self, power: &PowerMode) -> &mut Self {
        self.power = Some(*power);
        self
    }

    pub fn hue(&mut self, hue: &Hue) -> &mut Self {
        self.hue = Some(*hue);
        self
    }

    pub fn saturation(&mut self, saturation: &Saturation) -> &mut Self {
        self.saturation = Some(*saturation);
        self
    }

    /// Set the brightness level.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::{Mutation, Brightness};
    ///
    /// let mut mutation = Mutation::new();
    /// mutation.brightness(&Brightness::create(100).unwrap());
    /// assert_eq!(mutation.has_color(), true);
    /// ```
    pub fn brightness(&mut self, brightness: &Brightness) -> &mut Self {
        self.brightness = Some(*brightness);
        self
    }

    pub fn kelvin(&mut self, kelvin: &Kelvin) -> &mut Self {
        self.kelvin = Some(*kelvin);
        self
    }

    /// Set every color component at once.
    pub fn color(&mut self, color: &Hsbk) -> &mut Self {
        self.hue = Some(color.hue);
        self.saturation = Some(color.saturation);
        self.brightness = Some(color.brightness);
        self.kelvin = Some(color.kelvin);
        self
    }
}

impl From<&PowerMode> for Mutation {
    fn from(power: &PowerMode) -> Self {
        let mut m = Mutation::new();
        m.power(power);
        m
    }
}

impl From<&Brightness> for Mutation {
    fn from(brightness: &Brightness) -> Self {
        let mut m = Mutation::new();
        m.brightness(brightness);
        m
    }
}

impl From<&Kelvin> for Mutation {
    fn from(kelvin: &Kelvin) -> Self {
        let mut m = Mutation::new();
        m.kelvin(kelvin);
        m
    }
}

impl From<&Hue> for Mutation {
    fn from(hue: &Hue) -> Self {
        let mut m = Mutation::new();
        m.hue(hue);
        m
    }
}

impl From<&Saturation> for Mutation {
    fn from(saturation: &Saturation) -> Self {
        let mut m = Mutation::new();
        m.saturation(saturation);
        m
    }
}

impl From<&Hsbk> for Mutation {
    fn from(color: &Hsbk) -> Self {
        let mut m = Mutation::new();
        m.color(color);
        m
    }
}
