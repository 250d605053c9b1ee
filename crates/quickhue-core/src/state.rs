//! In-memory model of the controlled light.

use serde::{Deserialize, Serialize};
use tracing::debug;

use quickhue_types::{BrightnessLevel, LightState};

/// Last known light state and brightness.
///
/// Brightness only exists while the light is on: every state change resets
/// it to [`BrightnessLevel::NotApplicable`], and brightness updates received
/// in any other state are ignored.
///
/// # Example
///
/// ```
/// use quickhue_core::LightModel;
/// use quickhue_types::{BrightnessLevel, LightState};
///
/// let mut model = LightModel::new();
/// model.apply_state(LightState::On);
/// assert_eq!(model.apply_brightness(50), Some(50));
///
/// model.apply_state(LightState::Off);
/// assert_eq!(model.brightness(), BrightnessLevel::NotApplicable);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightModel {
    state: LightState,
    brightness: BrightnessLevel,
}

impl LightModel {
    /// A model in [`LightState::Unknown`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn brightness(&self) -> BrightnessLevel {
        self.brightness
    }

    /// Record a reported light state.
    pub fn apply_state(&mut self, state: LightState) {
        self.state = state;
        self.brightness = BrightnessLevel::NotApplicable;
    }

    /// Record a reported brightness percentage.
    ///
    /// Returns the accepted percentage, or `None` if the light is not on or
    /// the value is outside `0..=99`.
    pub fn apply_brightness(&mut self, percent: i16) -> Option<u8> {
        if !self.state.accepts_brightness() {
            debug!("Ignoring brightness {}% while light is {}", percent, self.state);
            return None;
        }

        let Some(level) = BrightnessLevel::from_percent(percent) else {
            debug!("Ignoring out of range brightness {}%", percent);
            return None;
        };
        self.brightness = level;
        level.percent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let model = LightModel::new();
        assert_eq!(model.state(), LightState::Unknown);
        assert_eq!(model.brightness(), BrightnessLevel::NotApplicable);
    }

    #[test]
    fn test_off_after_on_resets_brightness() {
        let mut model = LightModel::new();
        model.apply_state(LightState::On);
        assert_eq!(model.apply_brightness(50), Some(50));
        assert_eq!(model.brightness(), BrightnessLevel::Percent(50));

        model.apply_state(LightState::Off);
        assert_eq!(model.brightness(), BrightnessLevel::NotApplicable);
    }

    #[test]
    fn test_every_state_change_resets_brightness() {
        for state in [
            LightState::On,
            LightState::Off,
            LightState::PowerSwitchedOff,
            LightState::Error,
            LightState::from_wire(42),
        ] {
            let mut model = LightModel::new();
            model.apply_state(LightState::On);
            model.apply_brightness(30);
            model.apply_state(state);
            assert_eq!(model.brightness(), BrightnessLevel::NotApplicable);
        }
    }

    #[test]
    fn test_out_of_range_brightness_rejected() {
        let mut model = LightModel::new();
        model.apply_state(LightState::On);
        model.apply_brightness(40);

        assert_eq!(model.apply_brightness(150), None);
        assert_eq!(model.apply_brightness(100), None);
        assert_eq!(model.apply_brightness(-1), None);
        assert_eq!(model.brightness(), BrightnessLevel::Percent(40));
    }

    #[test]
    fn test_brightness_ignored_unless_on() {
        for state in [
            LightState::Unknown,
            LightState::Off,
            LightState::PowerSwitchedOff,
            LightState::Error,
        ] {
            let mut model = LightModel::new();
            model.apply_state(state);
            assert_eq!(model.apply_brightness(50), None);
            assert_eq!(model.brightness(), BrightnessLevel::NotApplicable);
        }
    }

    #[test]
    fn test_brightness_bounds_accepted() {
        let mut model = LightModel::new();
        model.apply_state(LightState::On);
        assert_eq!(model.apply_brightness(0), Some(0));
        assert_eq!(model.apply_brightness(99), Some(99));
    }
}
