//! Brightness and saturation levels.

use log::warn;
use serde::{Deserialize, Serialize};

/// Brightness level from 0 to 254.
///
/// 0 is the dimmest level the bulb supports; it does not switch the light off.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Brightness {
    pub(crate) value: u8,
}

impl Brightness {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 254;

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Returns None if value is outside valid range (0-254).
    pub fn create(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Brightness { value })
    }

    /// Clamp `value` into range, warning when it had to be adjusted.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Brightness;
    ///
    /// assert_eq!(Brightness::clamped(255).value(), 254);
    /// assert_eq!(Brightness::clamped(100).value(), 100);
    /// ```
    pub fn clamped(value: u8) -> Self {
        Self::clamped_for(value, module_path!())
    }

    pub(crate) fn clamped_for(value: u8, log_target: &str) -> Self {
        if value > Self::MAX {
            warn!(target: log_target, "{} is the brightest allowed level, got {}", Self::MAX, value);
        }
        Brightness {
            value: value.min(Self::MAX),
        }
    }
}

/// Saturation from 0 (white) to 254 (most saturated).
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Saturation {
    pub(crate) value: u8,
}

impl Saturation {
    pub const MAX: u8 = 254;

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Clamp `value` into range, warning when it had to be adjusted.
    ///
    /// ```
    /// use hue_lights_rs::Saturation;
    ///
    /// assert_eq!(Saturation::clamped(255).value(), 254);
    /// ```
    pub fn clamped(value: u8) -> Self {
        Self::clamped_for(value, module_path!())
    }

    pub(crate) fn clamped_for(value: u8, log_target: &str) -> Self {
        if value > Self::MAX {
            warn!(
                target: log_target,
                "{} is the most saturated allowed level, got {}", Self::MAX, value
            );
        }
        Saturation {
            value: value.min(Self::MAX),
        }
    }
}
