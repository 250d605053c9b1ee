//! The application context tying the control core together.
//!
//! [`LightController`] owns the command sender, the settings store, the
//! light model and the GUI observer. The input layer calls its `request_*`
//! methods; the transport calls its `inbox_*` methods. None of them fail:
//! every error is logged (and published as a [`ControlEvent`] when an event
//! dispatcher is attached) and the controller carries on.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use quickhue_types::light::wire_to_percentage;
use quickhue_types::{BrightnessLevel, Dictionary, LightState};

use crate::app_message::AppMessageResult;
use crate::config::ControlConfig;
use crate::dispatcher::{DeferredAction, InboundUpdate, ParsedMessage, parse_message};
use crate::error::{Error, Result};
use crate::events::{ControlEvent, EventDispatcher};
use crate::sender::CommandSender;
use crate::settings::{SettingKey, SettingsStore};
use crate::state::LightModel;
use crate::storage::FileStorage;
use crate::traits::{AppChannel, LightObserver};

/// Watch-side controller for a single light.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use quickhue_core::{LightController, MockChannel, NoopObserver, SettingsStore};
/// use quickhue_types::{Dictionary, LightState, MessageKey, Tuple};
///
/// #[tokio::main]
/// async fn main() {
///     let controller = LightController::new(
///         Arc::new(MockChannel::new()),
///         Arc::new(SettingsStore::in_memory()),
///         Arc::new(NoopObserver),
///     );
///
///     let message = Dictionary::new().with(Tuple::int8(MessageKey::LightState, 1));
///     controller.inbox_received(&message).await;
///     assert_eq!(controller.light_state().await, LightState::On);
/// }
/// ```
pub struct LightController {
    sender: CommandSender,
    settings: Arc<SettingsStore>,
    model: Mutex<LightModel>,
    observer: Arc<dyn LightObserver>,
    events: Option<EventDispatcher>,
}

impl std::fmt::Debug for LightController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightController")
            .field("sender", &self.sender)
            .field("settings", &self.settings)
            .finish()
    }
}

impl LightController {
    /// Create a controller with the default retry policies.
    pub fn new(
        channel: Arc<dyn AppChannel>,
        settings: Arc<SettingsStore>,
        observer: Arc<dyn LightObserver>,
    ) -> Self {
        let sender = CommandSender::new(channel, Arc::clone(&settings));
        Self::with_sender(sender, observer)
    }

    /// Create a controller around a preconfigured sender.
    pub fn with_sender(sender: CommandSender, observer: Arc<dyn LightObserver>) -> Self {
        Self {
            settings: Arc::clone(sender.settings()),
            sender,
            model: Mutex::new(LightModel::new()),
            observer,
            events: None,
        }
    }

    /// Create a controller from a validated configuration, with settings
    /// persisted in the configured file.
    pub fn from_config(
        config: &ControlConfig,
        channel: Arc<dyn AppChannel>,
        observer: Arc<dyn LightObserver>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::invalid_config(e.to_string()))?;

        let storage = FileStorage::open(config.storage.resolved_path())?;
        let settings = Arc::new(SettingsStore::new(Arc::new(storage)));
        let sender = CommandSender::new(channel, settings)
            .toggle_retry(config.retry.toggle.to_retry_config())
            .brightness_retry(config.retry.brightness.to_retry_config())
            .outbox_size(config.channel.outbox_size);

        Ok(Self::with_sender(sender, observer))
    }

    /// Publish controller events on `dispatcher`.
    ///
    /// Light state and brightness changes go to the observer only; pair this
    /// with an [`crate::EventObserver`] on the same dispatcher to get them
    /// as events too.
    #[must_use]
    pub fn with_events(mut self, dispatcher: EventDispatcher) -> Self {
        self.events = Some(dispatcher);
        self
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn sender(&self) -> &CommandSender {
        &self.sender
    }

    /// Snapshot of the light model.
    pub async fn model(&self) -> LightModel {
        *self.model.lock().await
    }

    pub async fn light_state(&self) -> LightState {
        self.model.lock().await.state()
    }

    pub async fn brightness(&self) -> BrightnessLevel {
        self.model.lock().await.brightness()
    }

    // --- Input layer ---

    /// Ask the relay to toggle the light.
    pub async fn request_toggle(&self) {
        if let Err(e) = self.sender.toggle().await {
            self.command_failed("toggle", &e);
        }
    }

    /// Ask the relay to set the brightness.
    pub async fn request_brightness_change(&self, percent: u8) {
        if let Err(e) = self.sender.set_brightness(percent).await {
            self.command_failed("brightness", &e);
        }
    }

    /// Push the cached settings to the relay, if they are complete.
    pub async fn request_settings_push(&self) {
        match self.sender.push_settings().await {
            Ok(()) => self.emit(ControlEvent::SettingsPushed),
            // Nothing cached yet is the normal state before first setup
            Err(Error::Settings(e)) => debug!("Settings push skipped: {}", e),
            Err(e) => self.command_failed("settings push", &e),
        }
    }

    /// Delete the cached bridge settings.
    pub fn forget_settings(&self) -> bool {
        self.settings.clear()
    }

    // --- Transport callbacks ---

    /// Handle a received message.
    pub async fn inbox_received(&self, message: &Dictionary) {
        match parse_message(message) {
            ParsedMessage::SettingsRequest(pending) => {
                info!(
                    "Relay requested settings ({} deferred actions)",
                    pending.actions().len()
                );
                self.request_settings_push().await;
                for action in pending.actions() {
                    self.replay(*action).await;
                }
            }
            ParsedMessage::Updates(updates) => {
                for update in updates {
                    self.apply(update).await;
                }
            }
        }
    }

    /// Decode and handle a received message.
    pub async fn inbox_received_bytes(&self, bytes: &[u8]) {
        match Dictionary::decode(bytes) {
            Ok(message) => self.inbox_received(&message).await,
            Err(e) => error!("Dropping undecodable message ({} bytes): {}", bytes.len(), e),
        }
    }

    /// The transport dropped an inbound message.
    pub fn inbox_dropped(&self, reason: AppMessageResult) {
        error!("Inbound message dropped: {}", reason);
        self.emit(ControlEvent::MessageDropped { reason });
    }

    async fn replay(&self, action: DeferredAction) {
        match action {
            DeferredAction::Toggle => {
                debug!("Replaying deferred toggle");
                self.request_toggle().await;
            }
            DeferredAction::SetBrightness { wire } => {
                let percent = wire_to_percentage(wire);
                debug!("Replaying deferred brightness {}%", percent);
                match u8::try_from(percent) {
                    Ok(percent) => self.request_brightness_change(percent).await,
                    Err(_) => warn!("Deferred brightness {}% is out of range", percent),
                }
            }
        }
    }

    async fn apply(&self, update: InboundUpdate) {
        match update {
            InboundUpdate::LightState(state) => {
                debug!("Light state: {}", state);
                self.model.lock().await.apply_state(state);
                self.observer.notify_light_state(state);
            }
            InboundUpdate::Brightness { wire } => {
                let percent = wire_to_percentage(wire);
                let accepted = self.model.lock().await.apply_brightness(percent);
                if let Some(percent) = accepted {
                    debug!("Brightness: {}%", percent);
                    self.observer.notify_brightness(percent);
                }
            }
            InboundUpdate::BridgeAddress(address) => {
                if self.settings.write_address(&address) {
                    self.emit(ControlEvent::SettingsUpdated {
                        key: SettingKey::BridgeAddress,
                    });
                }
            }
            InboundUpdate::BridgeCredential(credential) => {
                if self.settings.write_credential(&credential) {
                    self.emit(ControlEvent::SettingsUpdated {
                        key: SettingKey::BridgeCredential,
                    });
                }
            }
            InboundUpdate::LightId(id) => {
                if self.settings.write_light_id(id) {
                    self.emit(ControlEvent::SettingsUpdated {
                        key: SettingKey::LightId,
                    });
                }
            }
        }
    }

    fn command_failed(&self, command: &str, error: &Error) {
        debug!("{} request dropped: {}", command, error);
        self.emit(ControlEvent::CommandFailed {
            command: command.to_string(),
            error: error.to_string(),
        });
    }

    fn emit(&self, event: ControlEvent) {
        if let Some(events) = &self.events {
            events.send(event);
        }
    }
}
