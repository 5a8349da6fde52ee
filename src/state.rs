//! Light state tracking.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::mutation::Mutation;
use crate::types::{Hsbk, PowerMode};

/// One addressable component of a [`LightState`].
///
/// Parses from the lowercase names used by characteristic bindings.
///
/// ```
/// use std::str::FromStr;
/// use lifx_lan_bridge::Field;
///
/// assert_eq!(Field::from_str("brightness").unwrap(), Field::Brightness);
/// assert_eq!(Field::Kelvin.to_string(), "kelvin");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Field {
    Power,
    Hue,
    Saturation,
    Brightness,
    Kelvin,
}

/// The value of a single [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Power(bool),
    Hue(u16),
    Saturation(u8),
    Brightness(u8),
    Kelvin(u16),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Power(on) => Some(*on),
            _ => None,
        }
    }

    /// Numeric value of any non-power field.
    pub fn as_u16(&self) -> Option<u16> {
        match *self {
            FieldValue::Power(_) => None,
            FieldValue::Hue(v) | FieldValue::Kelvin(v) => Some(v),
            FieldValue::Saturation(v) | FieldValue::Brightness(v) => Some(u16::from(v)),
        }
    }
}

/// The last known composite state of a bulb.
///
/// Always replaced as a whole after a live read so that a brightness value
/// is never paired with a temperature from an older read.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightState {
    power: PowerMode,
    color: Hsbk,
}

impl LightState {
    pub fn new(power: PowerMode, color: Hsbk) -> Self {
        LightState { power, color }
    }

    pub fn power(&self) -> PowerMode {
        self.power
    }

    pub fn color(&self) -> &Hsbk {
        &self.color
    }

    /// Read one field.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::{Field, FieldValue, LightState};
    ///
    /// let state = LightState::default();
    /// assert_eq!(state.get(Field::Power), FieldValue::Power(false));
    /// assert_eq!(state.get(Field::Brightness), FieldValue::Brightness(50));
    /// assert_eq!(state.get(Field::Kelvin), FieldValue::Kelvin(2500));
    /// ```
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Power => FieldValue::Power(self.power.is_on()),
            Field::Hue => FieldValue::Hue(self.color.hue.degrees()),
            Field::Saturation => FieldValue::Saturation(self.color.saturation.value()),
            Field::Brightness => FieldValue::Brightness(self.color.brightness.value()),
            Field::Kelvin => FieldValue::Kelvin(self.color.kelvin.kelvin()),
        }
    }

    /// Apply the attributes set in a mutation; unset ones keep their value.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_bridge::{Brightness, Field, FieldValue, LightState, Mutation, PowerMode};
    ///
    /// let mut state = LightState::default();
    /// let mut mutation = Mutation::from(&PowerMode::On);
    /// mutation.brightness(&Brightness::create(80).unwrap());
    /// state.apply(&mutation);
    ///
    /// assert_eq!(state.get(Field::Power), FieldValue::Power(true));
    /// assert_eq!(state.get(Field::Brightness), FieldValue::Brightness(80));
    /// assert_eq!(state.get(Field::Kelvin), FieldValue::Kelvin(2500));
    /// ```
    pub fn apply(&mut self, mutation: &Mutation) {
        if let Some(power) = mutation.power {
            self.power = power;
        }
        if let Some(hue) = mutation.hue {
            self.color.hue = hue;
        }
        if let Some(saturation) = mutation.saturation {
            self.color.saturation = saturation;
        }
        if let Some(brightness) = mutation.brightness {
            self.color.brightness = brightness;
        }
        if let Some(kelvin) = mutation.kelvin {
            self.color.kelvin = kelvin;
        }
    }
}

/// What a bulb reports when its state is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReport {
    /// User-assigned label, if the bulb has one.
    pub label: Option<String>,
    pub state: LightState,
}

impl StateReport {
    pub fn new(label: Option<&str>, state: LightState) -> Self {
        StateReport {
            label: label.filter(|l| !l.trim().is_empty()).map(String::from),
            state,
        }
    }
}

impl From<LightState> for StateReport {
    fn from(state: LightState) -> Self {
        StateReport { label: None, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hue, Kelvin};
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_field_readable() {
        let state = LightState::new(PowerMode::On, Hsbk::create(200, 40, 70, 4000).unwrap());
        let values: Vec<FieldValue> = Field::iter().map(|f| state.get(f)).collect();
        assert_eq!(
            values,
            vec![
                FieldValue::Power(true),
                FieldValue::Hue(200),
                FieldValue::Saturation(40),
                FieldValue::Brightness(70),
                FieldValue::Kelvin(4000),
            ]
        );
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let mut state = LightState::new(PowerMode::On, Hsbk::create(10, 20, 30, 3000).unwrap());
        state.apply(&Mutation::from(&Hue::create(300).unwrap()));
        assert_eq!(state.get(Field::Hue), FieldValue::Hue(300));
        assert_eq!(state.get(Field::Power), FieldValue::Power(true));
        assert_eq!(state.color().kelvin, Kelvin::create(3000).unwrap());
    }

    #[test]
    fn test_blank_label_is_dropped() {
        assert_eq!(StateReport::new(Some("  "), LightState::default()).label, None);
        assert_eq!(
            StateReport::new(Some("Desk"), LightState::default()).label.as_deref(),
            Some("Desk")
        );
    }

    #[test]
    fn test_field_value_accessors() {
        assert_eq!(FieldValue::Power(true).as_bool(), Some(true));
        assert_eq!(FieldValue::Power(true).as_u16(), None);
        assert_eq!(FieldValue::Saturation(42).as_u16(), Some(42));
        assert_eq!(FieldValue::Hue(42).as_bool(), None);
    }
}
