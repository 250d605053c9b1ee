//! Control event system for light and settings notifications.
//!
//! This module provides an event-based alternative to implementing
//! [`LightObserver`] directly: any number of subscribers receive the same
//! stream of [`ControlEvent`]s over a broadcast channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use quickhue_types::LightState;

use crate::app_message::AppMessageResult;
use crate::settings::SettingKey;
use crate::traits::LightObserver;

/// Events emitted by the control core.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ControlEvent {
    /// The relay reported a light state.
    LightStateChanged { state: LightState },
    /// A brightness report was accepted.
    BrightnessChanged { percent: u8 },
    /// A bridge setting was written to the store.
    SettingsUpdated { key: SettingKey },
    /// Cached settings were sent to the relay.
    SettingsPushed,
    /// A command failed after its last attempt.
    CommandFailed { command: String, error: String },
    /// The transport dropped an inbound message.
    MessageDropped { reason: AppMessageResult },
}

/// Sender for control events.
pub type EventSender = broadcast::Sender<ControlEvent>;

/// Receiver for control events.
pub type EventReceiver = broadcast::Receiver<ControlEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: ControlEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

/// A [`LightObserver`] that republishes notifications as [`ControlEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventObserver {
    dispatcher: EventDispatcher,
}

impl EventObserver {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Subscribe to the events this observer publishes.
    pub fn subscribe(&self) -> EventReceiver {
        self.dispatcher.subscribe()
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }
}

impl LightObserver for EventObserver {
    fn notify_light_state(&self, state: LightState) {
        self.dispatcher
            .send(ControlEvent::LightStateChanged { state });
    }

    fn notify_brightness(&self, percent: u8) {
        self.dispatcher
            .send(ControlEvent::BrightnessChanged { percent });
    }
}
