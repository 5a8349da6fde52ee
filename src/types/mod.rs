//! Value types for light control parameters.

mod brightness;
mod color;
mod hue_saturation;
mod kelvin;
mod power;

pub use brightness::Brightness;
pub use color::Hsbk;
pub use hue_saturation::{Hue, Saturation};
pub use kelvin::Kelvin;
pub use power::PowerMode;
