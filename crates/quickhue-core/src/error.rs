//! Error types for quickhue-core.
//!
//! This module defines the errors that can surface from sending commands,
//! reading cached settings, and decoding inbound messages.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::Channel`] with [`AppMessageResult::Busy`] | Retry after a short delay | Outbox still draining |
//! | [`Error::Channel`] with any other result | Drop | Phone unreachable or message refused |
//! | [`Error::Settings`] | Drop, wait for the relay to send settings | Nothing cached yet |
//! | [`Error::Storage`] | Fix the storage path or permissions | Backend unusable |
//! | [`Error::Parse`] | Drop the message | Content unknown, cannot be replayed |
//! | [`Error::InvalidBrightness`] | Fix the caller | Percentages stop at 99 |
//! | [`Error::InvalidConfig`] | Fix configuration and restart | |
//!
//! None of these are fatal. The [`crate::LightController`] logs every error
//! it gets from the sender and carries on; the `Result`s exist so that
//! callers and tests can observe what happened.

use thiserror::Error;

use quickhue_types::ParseError;

use crate::app_message::AppMessageResult;
use crate::settings::StoreError;
use crate::storage::StorageError;

/// Errors that can occur in the control core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The channel refused or failed a send.
    #[error("{operation} failed: {result}")]
    Channel {
        /// The command that was being sent.
        operation: String,
        /// Result of the last attempt.
        result: AppMessageResult,
    },

    /// Cached bridge settings could not be read.
    #[error("Settings unavailable: {0}")]
    Settings(#[from] StoreError),

    /// The settings storage backend could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// An inbound message could not be decoded.
    #[error("Invalid message: {0}")]
    Parse(#[from] ParseError),

    /// Requested brightness is outside `0..=99`.
    #[error("Brightness {0}% is out of range (0-99)")]
    InvalidBrightness(u8),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a channel error for a named operation.
    pub fn channel(operation: impl Into<String>, result: AppMessageResult) -> Self {
        Self::Channel {
            operation: operation.into(),
            result,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this is a busy channel, the one transient send failure.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Error::Channel {
                result: AppMessageResult::Busy,
                ..
            }
        )
    }
}

/// Result type alias using quickhue-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingKey;

    #[test]
    fn test_error_display() {
        let err = Error::channel("toggle", AppMessageResult::NotConnected);
        assert_eq!(err.to_string(), "toggle failed: phone not connected");

        let err = Error::InvalidBrightness(150);
        assert!(err.to_string().contains("150%"));

        let err = Error::from(StoreError::Unavailable(SettingKey::BridgeCredential));
        assert!(err.to_string().contains("bridge credential"));
    }

    #[test]
    fn test_is_busy() {
        assert!(Error::channel("toggle", AppMessageResult::Busy).is_busy());
        assert!(!Error::channel("toggle", AppMessageResult::Closed).is_busy());
        assert!(!Error::InvalidBrightness(100).is_busy());
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ParseError::TrailingBytes(2).into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
