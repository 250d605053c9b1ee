//! Trait abstractions for the collaborators around the control core.
//!
//! [`AppChannel`] abstracts over the message transport to the phone, so the
//! same sender works against the real channel and against
//! [`crate::MockChannel`] in tests. [`LightObserver`] is the seam to the GUI.

use async_trait::async_trait;

use quickhue_types::{Dictionary, LightState};

use crate::app_message::AppMessageResult;

/// Message-oriented channel to the phone-side relay.
///
/// # Example
///
/// ```ignore
/// use quickhue_core::{AppChannel, AppMessageResult};
///
/// async fn ping<C: AppChannel>(channel: &C, message: &Dictionary) -> bool {
///     channel.send(message).await == AppMessageResult::Ok
/// }
/// ```
#[async_trait]
pub trait AppChannel: Send + Sync {
    /// Make one attempt to send a message.
    ///
    /// Returns [`AppMessageResult::Ok`] once the message has been handed to
    /// the transport. Implementations must not retry on their own; the
    /// caller owns the retry policy.
    async fn send(&self, message: &Dictionary) -> AppMessageResult;
}

/// Receiver of light state changes, typically the GUI.
///
/// Called synchronously while an inbound message is being dispatched, so
/// implementations must return quickly and must not fail.
pub trait LightObserver: Send + Sync {
    /// The light's power state changed.
    fn notify_light_state(&self, state: LightState);

    /// A new brightness percentage (`0..=99`) was accepted.
    fn notify_brightness(&self, percent: u8);
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl LightObserver for NoopObserver {
    fn notify_light_state(&self, _state: LightState) {}

    fn notify_brightness(&self, _percent: u8) {}
}
