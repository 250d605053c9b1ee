//! Wire types for the QuickHue watch-to-bridge message channel.
//!
//! This crate holds everything both ends of the channel must agree on and
//! nothing that performs I/O, so it can be shared by the watch-side control
//! core and by relay simulators or test harnesses.
//!
//! # Features
//!
//! - Message keys and their declared value types
//! - A typed, ordered key-value [`Dictionary`] with its binary codec
//! - Light state and brightness types, with the 0-255 ⇄ percent conversion
//! - Error types for message decoding
//!
//! # Example
//!
//! ```
//! use quickhue_types::{Dictionary, LightState, MessageKey, Tuple};
//!
//! let bytes = Dictionary::new()
//!     .with(Tuple::int8(MessageKey::LightState, 1))
//!     .encode()
//!     .unwrap();
//!
//! let message = Dictionary::decode(&bytes).unwrap();
//! let state = message
//!     .get(MessageKey::LightState)
//!     .and_then(Tuple::as_i8)
//!     .map(LightState::from_wire);
//! assert_eq!(state, Some(LightState::On));
//! ```

pub mod dictionary;
pub mod error;
pub mod keys;
pub mod light;

pub use dictionary::{Dictionary, OUTBOX_SIZE, Tuple, TupleType, TupleValue};
pub use error::{ParseError, ParseResult};
pub use keys::MessageKey;
pub use light::{BrightnessLevel, LightState, MAX_BRIGHTNESS_PERCENT};
