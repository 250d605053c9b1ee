//! Test doubles for the control core's collaborators.
//!
//! This module provides stand-ins that let the controller be exercised
//! without a watch, a phone or a bridge.
//!
//! # Features
//!
//! - [`MockChannel`]: an [`AppChannel`] with scripted results, busy failure
//!   injection, latency simulation and a log of every message it accepted
//! - [`RecordingObserver`]: a [`LightObserver`] that records notifications
//! - [`LimitedAllocator`]: a [`BufferAllocator`] that fails above a size, for
//!   simulating memory pressure

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use quickhue_types::{Dictionary, LightState, OUTBOX_SIZE};

use crate::app_message::AppMessageResult;
use crate::buffer::{BufferAllocator, HeapAllocator};
use crate::traits::{AppChannel, LightObserver};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock message channel for testing.
///
/// Each call to [`AppChannel::send`] is one attempt. The result of an
/// attempt is decided in this order:
///
/// 1. A pending injected busy failure ([`MockChannel::set_busy_failures`])
/// 2. The next scripted result ([`MockChannel::push_results`])
/// 3. [`AppMessageResult::BufferOverflow`] if the message exceeds the outbox
/// 4. [`AppMessageResult::Ok`]
///
/// # Example
///
/// ```
/// use quickhue_core::{AppChannel, AppMessageResult, MockChannel};
/// use quickhue_types::{Dictionary, MessageKey, Tuple};
///
/// #[tokio::main]
/// async fn main() {
///     let channel = MockChannel::new();
///     channel.set_busy_failures(1);
///
///     let message = Dictionary::new().with(Tuple::int8(MessageKey::LightState, 0));
///     assert_eq!(channel.send(&message).await, AppMessageResult::Busy);
///     assert_eq!(channel.send(&message).await, AppMessageResult::Ok);
///     assert_eq!(channel.send_count(), 2);
///     assert_eq!(channel.sent().len(), 1);
/// }
/// ```
#[derive(Debug)]
pub struct MockChannel {
    scripted: Mutex<VecDeque<AppMessageResult>>,
    attempted: Mutex<Vec<Dictionary>>,
    sent: Mutex<Vec<Dictionary>>,
    remaining_busy: AtomicU32,
    send_count: AtomicU32,
    latency_ms: AtomicU64,
    outbox_size: AtomicUsize,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChannel {
    /// Create a channel that accepts everything.
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            attempted: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            remaining_busy: AtomicU32::new(0),
            send_count: AtomicU32::new(0),
            latency_ms: AtomicU64::new(0),
            outbox_size: AtomicUsize::new(OUTBOX_SIZE),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    /// Answer the next `count` attempts with [`AppMessageResult::Busy`].
    pub fn set_busy_failures(&self, count: u32) {
        self.remaining_busy.store(count, Ordering::Relaxed);
    }

    /// Get the number of remaining injected busy failures.
    pub fn remaining_busy(&self) -> u32 {
        self.remaining_busy.load(Ordering::Relaxed)
    }

    /// Queue results for upcoming attempts.
    pub fn push_results(&self, results: impl IntoIterator<Item = AppMessageResult>) {
        lock(&self.scripted).extend(results);
    }

    /// Set simulated send latency.
    ///
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Set the largest message the channel accepts.
    pub fn set_outbox_size(&self, size: usize) {
        self.outbox_size.store(size, Ordering::Relaxed);
    }

    /// Number of send attempts so far.
    pub fn send_count(&self) -> u32 {
        self.send_count.load(Ordering::Relaxed)
    }

    /// Every message passed to `send`, accepted or not.
    pub fn attempted(&self) -> Vec<Dictionary> {
        lock(&self.attempted).clone()
    }

    /// Messages that were accepted, in order.
    pub fn sent(&self) -> Vec<Dictionary> {
        lock(&self.sent).clone()
    }

    /// Highest number of sends observed running at the same time.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::Relaxed)
    }

    /// Forget recorded messages and counters. Injected failures are kept.
    pub fn reset(&self) {
        lock(&self.attempted).clear();
        lock(&self.sent).clear();
        self.send_count.store(0, Ordering::Relaxed);
        self.max_in_flight.store(0, Ordering::Relaxed);
    }

    fn next_result(&self, message: &Dictionary) -> AppMessageResult {
        let busy = self
            .remaining_busy
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if busy {
            return AppMessageResult::Busy;
        }
        if let Some(result) = lock(&self.scripted).pop_front() {
            return result;
        }
        if message.encoded_len() > self.outbox_size.load(Ordering::Relaxed) {
            return AppMessageResult::BufferOverflow;
        }
        AppMessageResult::Ok
    }
}

#[async_trait]
impl AppChannel for MockChannel {
    async fn send(&self, message: &Dictionary) -> AppMessageResult {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        self.send_count.fetch_add(1, Ordering::Relaxed);
        lock(&self.attempted).push(message.clone());

        let result = self.next_result(message);
        if result.is_ok() {
            lock(&self.sent).push(message.clone());
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// A notification received by a [`RecordingObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    LightState(LightState),
    Brightness(u8),
}

/// A [`LightObserver`] that records every notification.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications, in order.
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    /// Light state notifications only.
    pub fn states(&self) -> Vec<LightState> {
        lock(&self.notifications)
            .iter()
            .filter_map(|n| match n {
                Notification::LightState(state) => Some(*state),
                Notification::Brightness(_) => None,
            })
            .collect()
    }

    /// Brightness notifications only.
    pub fn brightness_values(&self) -> Vec<u8> {
        lock(&self.notifications)
            .iter()
            .filter_map(|n| match n {
                Notification::Brightness(percent) => Some(*percent),
                Notification::LightState(_) => None,
            })
            .collect()
    }
}

impl LightObserver for RecordingObserver {
    fn notify_light_state(&self, state: LightState) {
        lock(&self.notifications).push(Notification::LightState(state));
    }

    fn notify_brightness(&self, percent: u8) {
        lock(&self.notifications).push(Notification::Brightness(percent));
    }
}

/// A [`BufferAllocator`] that refuses buffers larger than a limit.
#[derive(Debug)]
pub struct LimitedAllocator {
    max_len: usize,
    requests: AtomicU32,
}

impl LimitedAllocator {
    /// Allocate at most `max_len` bytes per buffer.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            requests: AtomicU32::new(0),
        }
    }

    /// Number of allocation requests, successful or not.
    pub fn requests(&self) -> u32 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl BufferAllocator for LimitedAllocator {
    fn allocate(&self, len: usize) -> Option<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if len > self.max_len {
            return None;
        }
        HeapAllocator.allocate(len)
    }
}
