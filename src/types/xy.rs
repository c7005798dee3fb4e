//! CIE-like chromaticity coordinates.

use log::warn;
use serde::{Deserialize, Serialize};

/// Chromaticity coordinates, each within 0.0-1.0.
///
/// Serialized as the two-element array the bridge expects.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Xy {
    x: f64,
    y: f64,
}

impl Xy {
    /// Clamp both coordinates into range, warning when either was adjusted.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Xy;
    ///
    /// let xy = Xy::clamped(1.2, -0.1);
    /// assert_eq!((xy.x(), xy.y()), (1.0, 0.0));
    /// ```
    pub fn clamped(x: f64, y: f64) -> Self {
        Self::clamped_for(x, y, module_path!())
    }

    pub(crate) fn clamped_for(x: f64, y: f64, log_target: &str) -> Self {
        let fix = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let xy = Xy { x: fix(x), y: fix(y) };
        if xy.x != x || xy.y != y {
            warn!(target: log_target, "xy coordinates must be within 0.0-1.0, got [{}, {}]", x, y);
        }
        xy
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

impl From<[f64; 2]> for Xy {
    fn from([x, y]: [f64; 2]) -> Self {
        Xy { x, y }
    }
}

impl From<Xy> for [f64; 2] {
    fn from(xy: Xy) -> Self {
        [xy.x, xy.y]
    }
}
