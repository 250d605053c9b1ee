//! Results reported by the message channel for each send attempt.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a single channel operation.
///
/// Numeric codes match the values the watch runtime reports, so a result
/// can be logged or compared against raw transport codes with
/// [`AppMessageResult::code`] and [`AppMessageResult::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppMessageResult {
    Ok,
    SendTimeout,
    SendRejected,
    NotConnected,
    AppNotRunning,
    InvalidArgs,
    /// The outbox is still busy with a previous message. The only
    /// retryable result.
    Busy,
    BufferOverflow,
    AlreadyReleased,
    CallbackAlreadyRegistered,
    CallbackNotRegistered,
    OutOfMemory,
    Closed,
    InternalError,
    InvalidState,
    /// A code this crate does not know about.
    Unknown(u32),
}

impl AppMessageResult {
    /// Map a raw transport code to a result.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickhue_core::AppMessageResult;
    ///
    /// assert_eq!(AppMessageResult::from_code(64), AppMessageResult::Busy);
    /// assert_eq!(AppMessageResult::from_code(3), AppMessageResult::Unknown(3));
    /// ```
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Ok,
            2 => Self::SendTimeout,
            4 => Self::SendRejected,
            8 => Self::NotConnected,
            16 => Self::AppNotRunning,
            32 => Self::InvalidArgs,
            64 => Self::Busy,
            128 => Self::BufferOverflow,
            512 => Self::AlreadyReleased,
            1024 => Self::CallbackAlreadyRegistered,
            2048 => Self::CallbackNotRegistered,
            4096 => Self::OutOfMemory,
            8192 => Self::Closed,
            16384 => Self::InternalError,
            32768 => Self::InvalidState,
            other => Self::Unknown(other),
        }
    }

    /// Raw transport code.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::SendTimeout => 2,
            Self::SendRejected => 4,
            Self::NotConnected => 8,
            Self::AppNotRunning => 16,
            Self::InvalidArgs => 32,
            Self::Busy => 64,
            Self::BufferOverflow => 128,
            Self::AlreadyReleased => 512,
            Self::CallbackAlreadyRegistered => 1024,
            Self::CallbackNotRegistered => 2048,
            Self::OutOfMemory => 4096,
            Self::Closed => 8192,
            Self::InternalError => 16384,
            Self::InvalidState => 32768,
            Self::Unknown(code) => code,
        }
    }

    /// Whether the send went through.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Whether trying again shortly may succeed.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl fmt::Display for AppMessageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::SendTimeout => write!(f, "send timed out"),
            Self::SendRejected => write!(f, "send rejected by the phone"),
            Self::NotConnected => write!(f, "phone not connected"),
            Self::AppNotRunning => write!(f, "phone-side app not running"),
            Self::InvalidArgs => write!(f, "invalid arguments"),
            Self::Busy => write!(f, "outbox busy"),
            Self::BufferOverflow => write!(f, "message too large for buffer"),
            Self::AlreadyReleased => write!(f, "buffer already released"),
            Self::CallbackAlreadyRegistered => write!(f, "callback already registered"),
            Self::CallbackNotRegistered => write!(f, "callback not registered"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::Closed => write!(f, "channel closed"),
            Self::InternalError => write!(f, "internal error"),
            Self::InvalidState => write!(f, "invalid state"),
            Self::Unknown(code) => write!(f, "unknown result code {}", code),
        }
    }
}
