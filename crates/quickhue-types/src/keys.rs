//! Message keys shared by the watch and the phone-side relay.
//!
//! Every field on the channel is identified by a small integer key. The
//! numbering is part of the wire contract and must match the relay's
//! `appKeys` table.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dictionary::TupleType;

/// Recognized message keys.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new keys in
/// future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[repr(u32)]
pub enum MessageKey {
    /// Outbound: toggle the light (value ignored). Inbound: light state.
    LightState = 0,
    /// Brightness on the bridge's 0-255 scale, as a 16-bit signed integer.
    Brightness = 1,
    /// Bridge IP address or host name.
    BridgeAddress = 2,
    /// Bridge user name (the access credential).
    BridgeCredential = 3,
    /// Target light identifier.
    LightId = 4,
    /// Relay asks the watch to push its cached settings.
    SettingsRequest = 5,
}

impl MessageKey {
    /// All recognized keys, in numeric order.
    pub const ALL: [MessageKey; 6] = [
        MessageKey::LightState,
        MessageKey::Brightness,
        MessageKey::BridgeAddress,
        MessageKey::BridgeCredential,
        MessageKey::LightId,
        MessageKey::SettingsRequest,
    ];

    /// Numeric key as used on the wire.
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Look up a key by its wire id.
    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.id() == id)
    }

    /// Declared value type and width for this key.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhue_types::{MessageKey, TupleType};
    ///
    /// assert_eq!(MessageKey::Brightness.value_type(), TupleType::Int(2));
    /// assert_eq!(MessageKey::BridgeAddress.value_type(), TupleType::CString);
    /// ```
    #[must_use]
    pub fn value_type(self) -> TupleType {
        match self {
            MessageKey::LightState | MessageKey::LightId | MessageKey::SettingsRequest => {
                TupleType::Int(1)
            }
            MessageKey::Brightness => TupleType::Int(2),
            MessageKey::BridgeAddress | MessageKey::BridgeCredential => TupleType::CString,
        }
    }
}

impl TryFrom<u32> for MessageKey {
    type Error = u32;

    /// Convert a wire id into a key, handing back the id when unrecognized.
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_id(value).ok_or(value)
    }
}

impl From<MessageKey> for u32 {
    fn from(key: MessageKey) -> Self {
        key.id()
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKey::LightState => "KEY_LIGHT_STATE",
            MessageKey::Brightness => "KEY_BRIGHTNESS",
            MessageKey::BridgeAddress => "KEY_BRIDGE_IP",
            MessageKey::BridgeCredential => "KEY_BRIDGE_USER",
            MessageKey::LightId => "KEY_LIGHT_ID",
            MessageKey::SettingsRequest => "KEY_SETTINGS_REQUEST",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ids_are_stable() {
        assert_eq!(MessageKey::LightState.id(), 0);
        assert_eq!(MessageKey::Brightness.id(), 1);
        assert_eq!(MessageKey::BridgeAddress.id(), 2);
        assert_eq!(MessageKey::BridgeCredential.id(), 3);
        assert_eq!(MessageKey::LightId.id(), 4);
        assert_eq!(MessageKey::SettingsRequest.id(), 5);
    }

    #[test]
    fn test_from_id() {
        for key in MessageKey::ALL {
            assert_eq!(MessageKey::from_id(key.id()), Some(key));
        }
        assert_eq!(MessageKey::from_id(6), None);
        assert_eq!(MessageKey::try_from(42), Err(42));
    }

    #[test]
    fn test_display_matches_relay_names() {
        assert_eq!(MessageKey::BridgeAddress.to_string(), "KEY_BRIDGE_IP");
        assert_eq!(MessageKey::SettingsRequest.to_string(), "KEY_SETTINGS_REQUEST");
    }
}
