//! Light state and brightness types, plus the brightness scale conversion.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest brightness percentage the watch displays.
pub const MAX_BRIGHTNESS_PERCENT: u8 = 99;

/// Ratio between the bridge's 0-255 brightness scale and percent.
pub const WIRE_SCALE: f32 = 2.56;

/// Power state of the controlled light, as last reported by the relay.
///
/// # Wire values
///
/// | Value | State |
/// |-------|-------|
/// | `0` | [`LightState::Off`] |
/// | `1` | [`LightState::On`] |
/// | `2` | [`LightState::PowerSwitchedOff`] |
/// | `-1` | [`LightState::Error`] |
///
/// Any other value is treated as [`LightState::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LightState {
    /// Nothing has been reported yet.
    #[default]
    Unknown,
    /// Light is on.
    On,
    /// Light is off.
    Off,
    /// The light's physical switch is off; the bridge cannot reach it.
    PowerSwitchedOff,
    /// The relay got no response, or a garbled one, from the bridge.
    Error,
}

impl LightState {
    /// Interpret a light state value received from the relay.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhue_types::LightState;
    ///
    /// assert_eq!(LightState::from_wire(1), LightState::On);
    /// assert_eq!(LightState::from_wire(0), LightState::Off);
    /// assert_eq!(LightState::from_wire(42), LightState::Error);
    /// ```
    #[must_use]
    pub fn from_wire(value: i8) -> Self {
        match value {
            0 => LightState::Off,
            1 => LightState::On,
            2 => LightState::PowerSwitchedOff,
            _ => LightState::Error,
        }
    }

    /// Wire value for this state, if it has one.
    ///
    /// [`LightState::Unknown`] only exists locally and has no wire value.
    #[must_use]
    pub fn to_wire(self) -> Option<i8> {
        match self {
            LightState::Unknown => None,
            LightState::Off => Some(0),
            LightState::On => Some(1),
            LightState::PowerSwitchedOff => Some(2),
            LightState::Error => Some(-1),
        }
    }

    /// Whether a brightness value is meaningful in this state.
    #[must_use]
    pub fn accepts_brightness(self) -> bool {
        matches!(self, LightState::On)
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightState::Unknown => write!(f, "unknown"),
            LightState::On => write!(f, "on"),
            LightState::Off => write!(f, "off"),
            LightState::PowerSwitchedOff => write!(f, "switched off"),
            LightState::Error => write!(f, "error"),
        }
    }
}

/// Brightness as shown on the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BrightnessLevel {
    /// Percentage in `0..=99`.
    Percent(u8),
    /// The light is not on, so it has no brightness.
    #[default]
    NotApplicable,
}

impl BrightnessLevel {
    /// Build a level from a percentage, rejecting anything above 99.
    #[must_use]
    pub fn from_percent(percent: i16) -> Option<Self> {
        u8::try_from(percent)
            .ok()
            .filter(|p| *p <= MAX_BRIGHTNESS_PERCENT)
            .map(BrightnessLevel::Percent)
    }

    /// The percentage, if applicable.
    #[must_use]
    pub fn percent(self) -> Option<u8> {
        match self {
            BrightnessLevel::Percent(p) => Some(p),
            BrightnessLevel::NotApplicable => None,
        }
    }
}

impl fmt::Display for BrightnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrightnessLevel::Percent(p) => write!(f, "{}%", p),
            BrightnessLevel::NotApplicable => write!(f, "n/a"),
        }
    }
}

/// Convert a wire brightness (0-255 scale) to a percentage.
///
/// The result is not range-checked: a wire value of 255 gives 100, and
/// negative or oversized wire values give out-of-range percentages that the
/// state model rejects.
///
/// The conversion is lossy. Converting a percentage to the wire scale and
/// back lands within one point of the original, not always on it.
///
/// # Examples
///
/// ```
/// use quickhue_types::light::wire_to_percentage;
///
/// assert_eq!(wire_to_percentage(128), 50);
/// assert_eq!(wire_to_percentage(0), 0);
/// assert_eq!(wire_to_percentage(255), 100);
/// ```
#[must_use]
pub fn wire_to_percentage(wire: i16) -> i16 {
    (f32::from(wire) / WIRE_SCALE).round() as i16
}

/// Convert a percentage to the wire brightness scale.
///
/// # Examples
///
/// ```
/// use quickhue_types::light::percentage_to_wire;
///
/// assert_eq!(percentage_to_wire(50), 128);
/// assert_eq!(percentage_to_wire(99), 253);
/// ```
#[must_use]
pub fn percentage_to_wire(percent: u8) -> i16 {
    (f32::from(percent) * WIRE_SCALE).round() as i16
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Percent -> wire -> percent stays within one point.
        #[test]
        fn round_trip_within_one(p in 0u8..=MAX_BRIGHTNESS_PERCENT) {
            let back = wire_to_percentage(percentage_to_wire(p));
            prop_assert!((back - i16::from(p)).abs() <= 1);
        }

        /// Every percentage maps inside the bridge's 0-255 range.
        #[test]
        fn wire_value_in_bridge_range(p in 0u8..=MAX_BRIGHTNESS_PERCENT) {
            let wire = percentage_to_wire(p);
            prop_assert!((0..=255).contains(&wire));
        }
    }
}
