//! Inbound message parsing.
//!
//! Turning a received [`Dictionary`] into work happens in two steps.
//! [`parse_message`] classifies the message and extracts typed values,
//! without side effects; the [`crate::LightController`] then applies the
//! result.
//!
//! A message carrying `SETTINGS_REQUEST` is a settings request and nothing
//! else: the relay wants the cached settings pushed back, and any
//! `LIGHT_STATE` or `BRIGHTNESS` bundled with it is a user action the relay
//! could not perform without those settings. Those actions are captured in
//! a [`PendingAction`] and replayed once the settings have been sent.

use tracing::{debug, warn};

use quickhue_types::{Dictionary, LightState, MessageKey, Tuple};

/// A user action deferred until settings have been pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Toggle the light.
    Toggle,
    /// Set the brightness, as received on the wire (0-255 scale).
    SetBrightness { wire: i16 },
}

/// Actions bundled with a settings request, in message order.
///
/// Holds at most one toggle and one brightness. A repeated brightness
/// replaces the earlier value in place; a repeated toggle is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAction {
    actions: Vec<DeferredAction>,
}

impl PendingAction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deferred actions in replay order.
    pub fn actions(&self) -> &[DeferredAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether a toggle is pending.
    pub fn has_toggle(&self) -> bool {
        self.actions.contains(&DeferredAction::Toggle)
    }

    /// The pending brightness wire value, if any.
    pub fn brightness(&self) -> Option<i16> {
        self.actions.iter().find_map(|action| match action {
            DeferredAction::SetBrightness { wire } => Some(*wire),
            DeferredAction::Toggle => None,
        })
    }

    pub fn record_toggle(&mut self) {
        if !self.has_toggle() {
            self.actions.push(DeferredAction::Toggle);
        }
    }

    pub fn record_brightness(&mut self, wire: i16) {
        let existing = self
            .actions
            .iter_mut()
            .find(|action| matches!(action, DeferredAction::SetBrightness { .. }));
        match existing {
            Some(action) => *action = DeferredAction::SetBrightness { wire },
            None => self.actions.push(DeferredAction::SetBrightness { wire }),
        }
    }
}

/// A single state or settings update from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUpdate {
    LightState(LightState),
    /// Brightness on the wire scale (0-255).
    Brightness { wire: i16 },
    BridgeAddress(String),
    BridgeCredential(String),
    LightId(i8),
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    /// Push cached settings, then replay the pending action.
    SettingsRequest(PendingAction),
    /// Apply each update in order.
    Updates(Vec<InboundUpdate>),
}

/// Classify an inbound message and extract its typed values.
///
/// Unknown keys, malformed values and fields whose type does not match
/// their key are logged and skipped; the rest of the message is still
/// processed.
///
/// # Example
///
/// ```
/// use quickhue_core::dispatcher::{DeferredAction, ParsedMessage, parse_message};
/// use quickhue_types::{Dictionary, MessageKey, Tuple};
///
/// let message = Dictionary::new()
///     .with(Tuple::int8(MessageKey::SettingsRequest, 1))
///     .with(Tuple::int8(MessageKey::LightState, 0));
///
/// match parse_message(&message) {
///     ParsedMessage::SettingsRequest(pending) => {
///         assert_eq!(pending.actions(), &[DeferredAction::Toggle]);
///     }
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn parse_message(message: &Dictionary) -> ParsedMessage {
    if message.contains_key(MessageKey::SettingsRequest) {
        debug!("Settings request with {} fields", message.len());
        ParsedMessage::SettingsRequest(parse_pending(message))
    } else {
        ParsedMessage::Updates(parse_updates(message))
    }
}

fn parse_pending(message: &Dictionary) -> PendingAction {
    let mut pending = PendingAction::new();
    for tuple in message {
        match MessageKey::from_id(tuple.key) {
            // The toggle value carries no meaning
            Some(MessageKey::LightState) => pending.record_toggle(),
            Some(MessageKey::Brightness) => {
                if let Some(wire) = typed(tuple, MessageKey::Brightness, Tuple::as_i16) {
                    pending.record_brightness(wire);
                }
            }
            _ => {}
        }
    }
    pending
}

fn parse_updates(message: &Dictionary) -> Vec<InboundUpdate> {
    let mut updates = Vec::with_capacity(message.len());
    for tuple in message {
        let Some(key) = MessageKey::from_id(tuple.key) else {
            warn!("Ignoring unknown message key {}", tuple.key);
            continue;
        };

        let update = match key {
            MessageKey::LightState => typed(tuple, key, Tuple::as_i8)
                .map(|v| InboundUpdate::LightState(LightState::from_wire(v))),
            MessageKey::Brightness => {
                typed(tuple, key, Tuple::as_i16).map(|wire| InboundUpdate::Brightness { wire })
            }
            MessageKey::BridgeAddress => typed(tuple, key, Tuple::as_str)
                .map(|s| InboundUpdate::BridgeAddress(s.to_string())),
            MessageKey::BridgeCredential => typed(tuple, key, Tuple::as_str)
                .map(|s| InboundUpdate::BridgeCredential(s.to_string())),
            MessageKey::LightId => typed(tuple, key, Tuple::as_i8).map(InboundUpdate::LightId),
            // Settings requests are classified before this point
            _ => None,
        };
        updates.extend(update);
    }
    updates
}

fn typed<'a, T>(
    tuple: &'a Tuple,
    key: MessageKey,
    read: impl FnOnce(&'a Tuple) -> Option<T>,
) -> Option<T> {
    let value = read(tuple);
    if value.is_none() {
        match tuple.problem() {
            Some(problem) => warn!("Skipping {}: {}", key, problem),
            None => warn!(
                "Skipping {}: expected {}, got {}",
                key,
                key.value_type(),
                tuple.value.tuple_type()
            ),
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickhue_types::TupleValue;

    fn settings_request() -> Tuple {
        Tuple::int8(MessageKey::SettingsRequest, 1)
    }

    #[test]
    fn test_plain_updates_in_order() {
        let message = Dictionary::new()
            .with(Tuple::int8(MessageKey::LightState, 1))
            .with(Tuple::int16(MessageKey::Brightness, 128))
            .with(Tuple::cstring(MessageKey::BridgeAddress, "10.0.0.2"))
            .with(Tuple::cstring(MessageKey::BridgeCredential, "secret"))
            .with(Tuple::int8(MessageKey::LightId, 3));

        assert_eq!(
            parse_message(&message),
            ParsedMessage::Updates(vec![
                InboundUpdate::LightState(LightState::On),
                InboundUpdate::Brightness { wire: 128 },
                InboundUpdate::BridgeAddress("10.0.0.2".to_string()),
                InboundUpdate::BridgeCredential("secret".to_string()),
                InboundUpdate::LightId(3),
            ])
        );
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let message = Dictionary::new()
            .with(Tuple::int8(42u32, 1))
            .with(Tuple::int8(MessageKey::LightState, 0));

        assert_eq!(
            parse_message(&message),
            ParsedMessage::Updates(vec![InboundUpdate::LightState(LightState::Off)])
        );
    }

    #[test]
    fn test_mistyped_fields_are_skipped() {
        let message = Dictionary::new()
            .with(Tuple::cstring(MessageKey::LightState, "on"))
            .with(Tuple::new(MessageKey::Brightness, TupleValue::Int32(128)))
            .with(Tuple::int8(MessageKey::BridgeAddress, 1))
            .with(Tuple::int8(MessageKey::LightId, 5));

        assert_eq!(
            parse_message(&message),
            ParsedMessage::Updates(vec![InboundUpdate::LightId(5)])
        );
    }

    #[test]
    fn test_malformed_values_are_skipped() {
        let wide = TupleValue::Malformed {
            tag: 3,
            data: vec![0; 8],
        };
        let unterminated = TupleValue::Malformed {
            tag: 1,
            data: b"10.0".to_vec(),
        };
        let message = Dictionary::new()
            .with(Tuple::new(MessageKey::Brightness, wide))
            .with(Tuple::new(MessageKey::BridgeAddress, unterminated))
            .with(Tuple::int8(MessageKey::LightState, 1));

        assert_eq!(
            parse_message(&message),
            ParsedMessage::Updates(vec![InboundUpdate::LightState(LightState::On)])
        );
    }

    #[test]
    fn test_unsigned_fields_accepted_at_declared_width() {
        let message = Dictionary::new()
            .with(Tuple::new(MessageKey::LightState, TupleValue::UInt8(2)))
            .with(Tuple::new(MessageKey::Brightness, TupleValue::UInt16(255)));

        assert_eq!(
            parse_message(&message),
            ParsedMessage::Updates(vec![
                InboundUpdate::LightState(LightState::PowerSwitchedOff),
                InboundUpdate::Brightness { wire: 255 },
            ])
        );
    }

    #[test]
    fn test_unrecognized_light_state_is_error() {
        let message = Dictionary::new().with(Tuple::int8(MessageKey::LightState, 9));
        assert_eq!(
            parse_message(&message),
            ParsedMessage::Updates(vec![InboundUpdate::LightState(LightState::Error)])
        );
    }

    #[test]
    fn test_settings_request_alone() {
        let message = Dictionary::new().with(settings_request());
        assert_eq!(
            parse_message(&message),
            ParsedMessage::SettingsRequest(PendingAction::new())
        );
    }

    #[test]
    fn test_settings_request_anywhere_in_message() {
        let message = Dictionary::new()
            .with(Tuple::int8(MessageKey::LightState, 1))
            .with(Tuple::cstring(MessageKey::BridgeAddress, "10.0.0.2"))
            .with(settings_request());

        let ParsedMessage::SettingsRequest(pending) = parse_message(&message) else {
            panic!("expected a settings request");
        };
        // Only the toggle survives; settings fields are not interpreted
        assert_eq!(pending.actions(), &[DeferredAction::Toggle]);
    }

    #[test]
    fn test_pending_actions_keep_message_order() {
        let message = Dictionary::new()
            .with(settings_request())
            .with(Tuple::int16(MessageKey::Brightness, 64))
            .with(Tuple::int8(MessageKey::LightState, 0));

        let ParsedMessage::SettingsRequest(pending) = parse_message(&message) else {
            panic!("expected a settings request");
        };
        assert_eq!(
            pending.actions(),
            &[
                DeferredAction::SetBrightness { wire: 64 },
                DeferredAction::Toggle
            ]
        );
    }

    #[test]
    fn test_pending_actions_deduplicate() {
        let message = Dictionary::new()
            .with(settings_request())
            .with(Tuple::int8(MessageKey::LightState, 0))
            .with(Tuple::int16(MessageKey::Brightness, 64))
            .with(Tuple::int8(MessageKey::LightState, 1))
            .with(Tuple::int16(MessageKey::Brightness, 200));

        let ParsedMessage::SettingsRequest(pending) = parse_message(&message) else {
            panic!("expected a settings request");
        };
        assert_eq!(
            pending.actions(),
            &[
                DeferredAction::Toggle,
                DeferredAction::SetBrightness { wire: 200 }
            ]
        );
        assert!(pending.has_toggle());
        assert_eq!(pending.brightness(), Some(200));
    }

    #[test]
    fn test_pending_brightness_must_be_typed() {
        let message = Dictionary::new()
            .with(settings_request())
            .with(Tuple::cstring(MessageKey::Brightness, "50"));

        let ParsedMessage::SettingsRequest(pending) = parse_message(&message) else {
            panic!("expected a settings request");
        };
        assert!(pending.is_empty());
    }
}
