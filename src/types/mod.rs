//! Value types for light control parameters.

mod alert;
mod brightness;
mod color_temp;
mod hue;
mod xy;

pub use alert::{Alert, Effect};
pub use brightness::{Brightness, Saturation};
pub use color_temp::{Kelvin, Mired};
pub use hue::Hue;
pub use xy::Xy;
