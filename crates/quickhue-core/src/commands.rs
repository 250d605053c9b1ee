//! Outbound message builders.
//!
//! Each command is a small [`Dictionary`] built fresh for every send
//! attempt.

use quickhue_types::light::percentage_to_wire;
use quickhue_types::{Dictionary, MessageKey, Tuple};

use crate::settings::BridgeSettings;

/// Value sent with a toggle request. The relay ignores it.
pub const TOGGLE_VALUE: i8 = 0;

/// Ask the relay to flip the light on or off.
/// Format: `{LIGHT_STATE: int8 0}`
#[must_use]
pub fn toggle_message() -> Dictionary {
    Dictionary::new().with(Tuple::int8(MessageKey::LightState, TOGGLE_VALUE))
}

/// Ask the relay to set the brightness.
/// Format: `{BRIGHTNESS: int16 wire}` where wire is on the 0-255 scale.
#[must_use]
pub fn brightness_message(percent: u8) -> Dictionary {
    Dictionary::new().with(Tuple::int16(
        MessageKey::Brightness,
        percentage_to_wire(percent),
    ))
}

/// Push cached settings to the relay.
/// Format: `{BRIDGE_ADDRESS: cstring, BRIDGE_CREDENTIAL: cstring, LIGHT_ID: int8}`
#[must_use]
pub fn settings_message(settings: &BridgeSettings) -> Dictionary {
    Dictionary::new()
        .with(Tuple::cstring(MessageKey::BridgeAddress, &settings.address))
        .with(Tuple::cstring(
            MessageKey::BridgeCredential,
            &settings.credential,
        ))
        .with(Tuple::int8(MessageKey::LightId, settings.light_id.get()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ADDRESS_BUDGET, CREDENTIAL_BUDGET, LightId};
    use quickhue_types::{OUTBOX_SIZE, TupleType};

    #[test]
    fn test_toggle_message() {
        let message = toggle_message();
        assert_eq!(message.len(), 1);
        let tuple = message.get(MessageKey::LightState).unwrap();
        assert_eq!(tuple.as_i8(), Some(TOGGLE_VALUE));
        assert_eq!(tuple.value.tuple_type(), TupleType::Int(1));
    }

    #[test]
    fn test_brightness_message_uses_wire_scale() {
        let message = brightness_message(50);
        assert_eq!(message.len(), 1);
        assert_eq!(
            message.get(MessageKey::Brightness).and_then(Tuple::as_i16),
            Some(128)
        );
        assert_eq!(
            brightness_message(99)
                .get(MessageKey::Brightness)
                .and_then(Tuple::as_i16),
            Some(253)
        );
    }

    #[test]
    fn test_settings_message() {
        let settings = BridgeSettings {
            address: "10.0.0.2".to_string(),
            credential: "secret".to_string(),
            light_id: LightId::new(3),
        };
        let message = settings_message(&settings);

        let keys: Vec<u32> = message.iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![2, 3, 4]);
        assert_eq!(
            message.get(MessageKey::BridgeAddress).and_then(Tuple::as_str),
            Some("10.0.0.2")
        );
        assert_eq!(
            message
                .get(MessageKey::BridgeCredential)
                .and_then(Tuple::as_str),
            Some("secret")
        );
        assert_eq!(
            message.get(MessageKey::LightId).and_then(Tuple::as_i8),
            Some(3)
        );
    }

    #[test]
    fn test_largest_settings_message_fits_outbox() {
        let settings = BridgeSettings {
            address: "a".repeat(ADDRESS_BUDGET - 1),
            credential: "c".repeat(CREDENTIAL_BUDGET - 1),
            light_id: LightId::new(i8::MAX),
        };
        assert!(settings_message(&settings).encoded_len() <= OUTBOX_SIZE);
    }
}
