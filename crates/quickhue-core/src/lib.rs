//! Watch-side control core for QuickHue.
//!
//! The watch cannot reach the lighting bridge itself. It talks to a relay
//! process on the phone over a narrow key-value message channel, and the
//! relay talks to the bridge. This crate is everything the watch needs on
//! its side of that channel.
//!
//! # Features
//!
//! - **Commands**: toggle, set brightness and push settings, each with its
//!   own bounded retry policy for a busy outbox
//! - **Inbound dispatch**: light state and brightness reports, settings
//!   updates, and settings requests with deferred action replay
//! - **Settings cache**: bridge address, credential and light id in a small
//!   persistent store with per-field budgets and truncation
//! - **State model**: light on/off/error and brightness 0-99
//! - **Configuration**: retry policies, storage path and outbox size from TOML
//! - **Events**: a broadcast stream of control events for any number of
//!   subscribers
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use quickhue_core::{LightController, MockChannel, NoopObserver, SettingsStore};
//! use quickhue_types::{Dictionary, MessageKey, Tuple};
//!
//! #[tokio::main]
//! async fn main() {
//!     let channel = Arc::new(MockChannel::new());
//!     let controller = LightController::new(
//!         channel.clone(),
//!         Arc::new(SettingsStore::in_memory()),
//!         Arc::new(NoopObserver),
//!     );
//!
//!     // The relay sends settings once they are configured on the phone
//!     let settings = Dictionary::new()
//!         .with(Tuple::cstring(MessageKey::BridgeAddress, "192.168.1.20"))
//!         .with(Tuple::cstring(MessageKey::BridgeCredential, "secret"))
//!         .with(Tuple::int8(MessageKey::LightId, 1));
//!     controller.inbox_received(&settings).await;
//!
//!     // A button press
//!     controller.request_toggle().await;
//!     assert_eq!(channel.sent().len(), 1);
//! }
//! ```

pub mod app_message;
pub mod buffer;
pub mod commands;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod mock;
pub mod retry;
pub mod sender;
pub mod settings;
pub mod state;
pub mod storage;
pub mod traits;

// Core exports
pub use app_message::AppMessageResult;
pub use controller::LightController;
pub use error::{Error, Result};
pub use sender::CommandSender;
pub use state::LightModel;
pub use traits::{AppChannel, LightObserver, NoopObserver};

pub use buffer::{BufferAllocator, HeapAllocator};
pub use config::{ConfigError, ControlConfig, ValidationError, default_config_path};
pub use dispatcher::{DeferredAction, InboundUpdate, ParsedMessage, PendingAction, parse_message};
pub use events::{ControlEvent, EventDispatcher, EventObserver, EventReceiver, EventSender};
pub use mock::{LimitedAllocator, MockChannel, RecordingObserver};
pub use retry::{RetryConfig, with_retry};
pub use settings::{BridgeSettings, LightId, SettingKey, SettingsStore, StoreError};
pub use storage::{
    FileStorage, MemoryStorage, PersistentStorage, StorageError, default_storage_path,
};

// Re-export from quickhue-types
pub use quickhue_types::{BrightnessLevel, Dictionary, LightState, MessageKey, Tuple, TupleValue};
