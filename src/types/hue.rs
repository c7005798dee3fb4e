//! Hue angle on the bridge's 16-bit color wheel.

use log::warn;
use serde::{Deserialize, Serialize};

/// Hue from 0 to 65535; both ends of the range are red.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Hue {
    pub(crate) value: u16,
}

impl Hue {
    pub const MAX: u16 = u16::MAX;

    pub fn new(value: u16) -> Self {
        Hue { value }
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    /// Clamp a wider integer into range, warning when it had to be adjusted.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Hue;
    ///
    /// assert_eq!(Hue::clamped(-5).value(), 0);
    /// assert_eq!(Hue::clamped(70_000).value(), 65535);
    /// assert_eq!(Hue::clamped(46_920).value(), 46920);
    /// ```
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(0, i64::from(Self::MAX));
        if clamped != value {
            warn!("hue must be within 0-{}, got {}", Self::MAX, value);
        }
        Hue {
            value: u16::try_from(clamped).unwrap_or(Self::MAX),
        }
    }
}
