//! Outbound command sender.
//!
//! Every command is a full send protocol: build the message, hand it to the
//! channel, and on a busy outbox try again according to the command's
//! [`RetryConfig`]. Only one command is in the outbox at a time; a command
//! issued while another is still retrying waits for it to finish.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use quickhue_types::{Dictionary, MAX_BRIGHTNESS_PERCENT, OUTBOX_SIZE};

use crate::app_message::AppMessageResult;
use crate::commands::{brightness_message, settings_message, toggle_message};
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry};
use crate::settings::SettingsStore;
use crate::traits::AppChannel;

/// Sends commands to the relay with per-command retry policies.
pub struct CommandSender {
    channel: Arc<dyn AppChannel>,
    settings: Arc<SettingsStore>,
    toggle_retry: RetryConfig,
    brightness_retry: RetryConfig,
    outbox_size: usize,
    outbox: Mutex<()>,
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("toggle_retry", &self.toggle_retry)
            .field("brightness_retry", &self.brightness_retry)
            .field("outbox_size", &self.outbox_size)
            .finish()
    }
}

impl CommandSender {
    /// Create a sender with the default retry policies.
    pub fn new(channel: Arc<dyn AppChannel>, settings: Arc<SettingsStore>) -> Self {
        Self {
            channel,
            settings,
            toggle_retry: RetryConfig::for_toggle(),
            brightness_retry: RetryConfig::for_brightness(),
            outbox_size: OUTBOX_SIZE,
            outbox: Mutex::new(()),
        }
    }

    /// Replace the toggle retry policy.
    #[must_use]
    pub fn toggle_retry(mut self, config: RetryConfig) -> Self {
        self.toggle_retry = config;
        self
    }

    /// Replace the brightness retry policy.
    #[must_use]
    pub fn brightness_retry(mut self, config: RetryConfig) -> Self {
        self.brightness_retry = config;
        self
    }

    /// Largest encoded message the channel accepts.
    #[must_use]
    pub fn outbox_size(mut self, size: usize) -> Self {
        self.outbox_size = size;
        self
    }

    /// The settings store this sender pushes from.
    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// Ask the relay to toggle the light.
    ///
    /// Retries on a busy outbox, 5 attempts 75 ms apart by default.
    pub async fn toggle(&self) -> Result<()> {
        let _outbox = self.outbox.lock().await;
        info!("Sending toggle");

        let result = with_retry(&self.toggle_retry, "toggle", || async move {
            self.send_once("toggle", &toggle_message()).await
        })
        .await;
        log_terminal_failure(&result);
        result
    }

    /// Ask the relay to set the brightness to `percent`.
    ///
    /// Retries on a busy outbox, 3 attempts 50 ms apart by default.
    /// Percentages above 99 are rejected without sending anything.
    pub async fn set_brightness(&self, percent: u8) -> Result<()> {
        if percent > MAX_BRIGHTNESS_PERCENT {
            return Err(Error::InvalidBrightness(percent));
        }

        let _outbox = self.outbox.lock().await;
        info!("Sending brightness {}%", percent);

        let result = with_retry(&self.brightness_retry, "brightness", || async move {
            self.send_once("brightness", &brightness_message(percent))
                .await
        })
        .await;
        log_terminal_failure(&result);
        result
    }

    /// Push the cached bridge settings to the relay.
    ///
    /// Sends nothing if any setting is missing. Never retried.
    pub async fn push_settings(&self) -> Result<()> {
        let _outbox = self.outbox.lock().await;

        let settings = match self.settings.read_all() {
            Ok(settings) => settings,
            Err(e) => {
                info!("Not pushing settings: {}", e);
                return Err(e.into());
            }
        };

        info!(
            "Pushing settings for light {} at {}",
            settings.light_id, settings.address
        );
        let result = self
            .send_once("settings push", &settings_message(&settings))
            .await;
        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }

    async fn send_once(&self, operation: &str, message: &Dictionary) -> Result<()> {
        let len = message.encoded_len();
        if len > self.outbox_size {
            warn!(
                "{} message is {} bytes, outbox holds {}",
                operation, len, self.outbox_size
            );
            return Err(Error::channel(operation, AppMessageResult::BufferOverflow));
        }

        match self.channel.send(message).await {
            AppMessageResult::Ok => {
                debug!("{} sent ({} bytes)", operation, len);
                Ok(())
            }
            result => Err(Error::channel(operation, result)),
        }
    }
}

fn log_terminal_failure(result: &Result<()>) {
    // Exhausted busy retries are already reported by the retry loop
    if let Err(e) = result
        && !e.is_busy()
    {
        warn!("{}", e);
    }
}
