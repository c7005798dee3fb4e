//! Color temperature in mireds and Kelvin.

use log::warn;
use serde::{Deserialize, Serialize};

/// Color temperature in mireds (reciprocal megakelvin), from 154 to 500.
///
/// Lower values are cooler (bluer) light, higher values warmer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Mired {
    pub(crate) value: u16,
}

impl Mired {
    pub const MIN: u16 = 154;
    pub const MAX: u16 = 500;

    pub fn value(&self) -> u16 {
        self.value
    }

    /// Clamp `value` into range, warning when it had to be adjusted.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Mired;
    ///
    /// assert_eq!(Mired::clamped(100).value(), 154);
    /// assert_eq!(Mired::clamped(600).value(), 500);
    /// ```
    pub fn clamped(value: u16) -> Self {
        Self::clamped_for(value, module_path!())
    }

    pub(crate) fn clamped_for(value: u16, log_target: &str) -> Self {
        if value < Self::MIN {
            warn!(target: log_target, "{} mireds is coolest allowed color temp", Self::MIN);
        } else if value > Self::MAX {
            warn!(target: log_target, "{} mireds is warmest allowed color temp", Self::MAX);
        }
        Mired {
            value: value.clamp(Self::MIN, Self::MAX),
        }
    }

    /// Kelvin view, `round(1e6 / mireds)`.
    pub fn to_kelvin(&self) -> u16 {
        reciprocal(self.value)
    }
}

/// Color temperature in Kelvin, from 2000K to 6500K.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Kelvin {
    pub(crate) kelvin: u16,
}

impl Kelvin {
    pub const MIN: u16 = 2000;
    pub const MAX: u16 = 6500;

    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Clamp `kelvin` into range, warning when it had to be adjusted.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Kelvin;
    ///
    /// assert_eq!(Kelvin::clamped(9000).kelvin(), 6500);
    /// assert_eq!(Kelvin::clamped(1500).kelvin(), 2000);
    /// ```
    pub fn clamped(kelvin: u16) -> Self {
        Self::clamped_for(kelvin, module_path!())
    }

    pub(crate) fn clamped_for(kelvin: u16, log_target: &str) -> Self {
        if kelvin > Self::MAX {
            warn!(target: log_target, "{} K is max allowed color temp", Self::MAX);
        } else if kelvin < Self::MIN {
            warn!(target: log_target, "{} K is min allowed color temp", Self::MIN);
        }
        Kelvin {
            kelvin: kelvin.clamp(Self::MIN, Self::MAX),
        }
    }

    /// Convert to mireds, `round(1e6 / kelvin)`.
    ///
    /// ```
    /// use hue_lights_rs::Kelvin;
    ///
    /// let mired = Kelvin::clamped(2700).to_mired();
    /// assert_eq!(mired.value(), 370);
    /// assert_eq!(mired.to_kelvin(), 2703);
    /// ```
    pub fn to_mired(&self) -> Mired {
        Mired {
            value: reciprocal(self.kelvin),
        }
    }
}

fn reciprocal(value: u16) -> u16 {
    if value == 0 {
        return u16::MAX;
    }
    let result = (1e6 / f64::from(value)).round();
    if result >= f64::from(u16::MAX) {
        u16::MAX
    } else {
        result as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_ends_convert_within_bounds() {
        assert_eq!(Kelvin::clamped(6500).to_mired().value(), 154);
        assert_eq!(Kelvin::clamped(2000).to_mired().value(), 500);
    }

    #[test]
    fn test_round_trip_is_within_one_kelvin() {
        for kelvin in (Kelvin::MIN..=Kelvin::MAX).step_by(50) {
            let back = Kelvin::clamped(kelvin).to_mired().to_kelvin();
            let drift = (f64::from(back) - f64::from(kelvin)).abs();
            // half a mired step, expressed in Kelvin
            let tolerance = f64::from(kelvin).powi(2) / 2e6 + 1.0;
            assert!(drift <= tolerance, "{kelvin} -> {back}");
        }
    }

    #[test]
    fn test_out_of_range_clamps_before_conversion() {
        assert_eq!(Kelvin::clamped(10_000).to_mired(), Kelvin::clamped(6500).to_mired());
        assert_eq!(Kelvin::clamped(1000).to_mired(), Kelvin::clamped(2000).to_mired());
    }
}
