//! Cached bridge settings.
//!
//! The watch keeps the three values it needs to talk to the bridge (the
//! bridge address, the access credential and the target light) in a small
//! persistent store, so they survive restarts and can be pushed back to the
//! relay on request.
//!
//! All three fields share a fixed persistence budget. Strings longer than
//! their field's budget are truncated on write, never rejected, and a write
//! either stores the complete truncated value or stores nothing.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use quickhue_types::MessageKey;

use crate::buffer::{
    AllocationTier, BufferAllocator, HeapAllocator, allocate_two_tier, shrink_to_len,
};
use crate::storage::{MemoryStorage, PersistentStorage, StorageError};

/// Total bytes available to the persisted settings.
pub const PERSIST_BUDGET: usize = 80;

/// Budget for the bridge address: 15 bytes plus a terminator slot.
pub const ADDRESS_BUDGET: usize = 16;

/// Budget for the light identifier, persisted as an `i32`.
pub const LIGHT_ID_BUDGET: usize = 4;

/// Bytes held back from the settings budget.
pub const RESERVED_BUDGET: usize = 4;

/// Budget for the bridge credential: whatever the other fields leave over.
pub const CREDENTIAL_BUDGET: usize =
    PERSIST_BUDGET - ADDRESS_BUDGET - LIGHT_ID_BUDGET - RESERVED_BUDGET;

/// Persisted settings keys. Numbers match the message keys carrying them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum SettingKey {
    BridgeAddress = 2,
    BridgeCredential = 3,
    LightId = 4,
}

impl SettingKey {
    /// All settings keys.
    pub const ALL: [SettingKey; 3] = [
        SettingKey::BridgeAddress,
        SettingKey::BridgeCredential,
        SettingKey::LightId,
    ];

    /// Storage key number.
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Bytes this field may occupy in storage.
    #[must_use]
    pub fn budget(self) -> usize {
        match self {
            SettingKey::BridgeAddress => ADDRESS_BUDGET,
            SettingKey::BridgeCredential => CREDENTIAL_BUDGET,
            SettingKey::LightId => LIGHT_ID_BUDGET,
        }
    }

    /// The message key that carries this setting.
    #[must_use]
    pub fn message_key(self) -> MessageKey {
        match self {
            SettingKey::BridgeAddress => MessageKey::BridgeAddress,
            SettingKey::BridgeCredential => MessageKey::BridgeCredential,
            SettingKey::LightId => MessageKey::LightId,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingKey::BridgeAddress => write!(f, "bridge address"),
            SettingKey::BridgeCredential => write!(f, "bridge credential"),
            SettingKey::LightId => write!(f, "light id"),
        }
    }
}

/// Reasons a cached setting cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The setting has never been written (or is empty/unset).
    #[error("{0} has not been stored")]
    Unavailable(SettingKey),

    /// No buffer could be allocated to read the setting into.
    #[error("out of memory reading {key} ({requested} bytes)")]
    OutOfMemory { key: SettingKey, requested: usize },

    /// The stored bytes are not a valid value.
    #[error("stored {0} is corrupt")]
    Corrupt(SettingKey),

    /// The storage backend failed.
    #[error("storage backend failed for {key}: {reason}")]
    Backend { key: SettingKey, reason: String },
}

/// Identifier of the light being controlled.
///
/// Valid identifiers are `>= 1`. A stored `0` and a missing value both mean
/// "no light chosen yet" and read back as [`LightId::UNSET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightId(i8);

impl LightId {
    /// No light has been configured.
    pub const UNSET: LightId = LightId(-1);

    /// Wrap a raw identifier, normalizing `0` to [`LightId::UNSET`].
    #[must_use]
    pub fn new(raw: i8) -> Self {
        if raw == 0 { Self::UNSET } else { Self(raw) }
    }

    /// Raw identifier.
    #[must_use]
    pub fn get(self) -> i8 {
        self.0
    }

    /// Whether this identifies an actual light.
    #[must_use]
    pub fn is_set(self) -> bool {
        self.0 >= 1
    }
}

impl Default for LightId {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "unset")
        }
    }
}

/// Everything needed to push settings back to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSettings {
    pub address: String,
    pub credential: String,
    pub light_id: LightId,
}

/// Cut `value` to fit a field of `budget` bytes (one byte is kept for the
/// terminator).
///
/// ASCII values keep exactly their first `budget - 1` bytes. The cut never
/// splits a UTF-8 character: a multi-byte character straddling the limit is
/// dropped whole, so such a value keeps fewer than `budget - 1` bytes and
/// always reads back as valid UTF-8.
///
/// # Examples
///
/// ```
/// use quickhue_core::settings::truncate_to_budget;
///
/// assert_eq!(truncate_to_budget("192.168.100.200:80", 16), "192.168.100.200");
/// assert_eq!(truncate_to_budget("10.0.0.2", 16), "10.0.0.2");
///
/// // "é" would occupy bytes 15 and 16; only 15 fit
/// assert_eq!(truncate_to_budget("hue-bridge-001é", 16), "hue-bridge-001");
/// ```
#[must_use]
pub fn truncate_to_budget(value: &str, budget: usize) -> &str {
    let max = budget.saturating_sub(1);
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Budget-aware store for the bridge settings.
///
/// # Example
///
/// ```
/// use quickhue_core::settings::{LightId, SettingsStore};
///
/// let store = SettingsStore::in_memory();
/// assert!(store.write_address("10.0.0.2"));
/// assert!(store.write_light_id(3));
///
/// assert_eq!(store.read_address().unwrap(), "10.0.0.2");
/// assert_eq!(store.read_light_id(), LightId::new(3));
/// assert!(store.read_credential().is_err());
/// ```
pub struct SettingsStore {
    storage: Arc<dyn PersistentStorage>,
    allocator: Arc<dyn BufferAllocator>,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("address_len", &self.storage.stored_len(SettingKey::BridgeAddress.id()))
            .field(
                "credential_len",
                &self.storage.stored_len(SettingKey::BridgeCredential.id()),
            )
            .finish()
    }
}

impl SettingsStore {
    /// Create a store over `storage`, allocating read buffers on the heap.
    pub fn new(storage: Arc<dyn PersistentStorage>) -> Self {
        Self::with_allocator(storage, Arc::new(HeapAllocator))
    }

    /// Create a store with a custom read buffer allocator.
    pub fn with_allocator(
        storage: Arc<dyn PersistentStorage>,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Self {
        Self { storage, allocator }
    }

    /// Create a store backed by a fresh [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    // --- Strings ---

    /// Store the bridge address, truncated to 15 bytes.
    ///
    /// Returns `false` if the backend refused the write.
    pub fn write_address(&self, address: &str) -> bool {
        self.write_string(SettingKey::BridgeAddress, address)
    }

    /// Store the bridge credential, truncated to its budget.
    ///
    /// Returns `false` if the backend refused the write.
    pub fn write_credential(&self, credential: &str) -> bool {
        self.write_string(SettingKey::BridgeCredential, credential)
    }

    /// Read the bridge address.
    pub fn read_address(&self) -> Result<String, StoreError> {
        self.read_string(SettingKey::BridgeAddress, false)
    }

    /// Read the bridge credential.
    ///
    /// If a full-budget buffer cannot be allocated, a buffer sized to the
    /// stored value is tried before giving up.
    pub fn read_credential(&self) -> Result<String, StoreError> {
        self.read_string(SettingKey::BridgeCredential, true)
    }

    fn write_string(&self, key: SettingKey, value: &str) -> bool {
        let stored = truncate_to_budget(value, key.budget());
        if stored.len() < value.len() {
            debug!(
                "Truncating {} from {} to {} bytes",
                key,
                value.len(),
                stored.len()
            );
        }

        match self.storage.write_bytes(key.id(), stored.as_bytes()) {
            Ok(()) => {
                info!("Stored {} ({} bytes)", key, stored.len());
                true
            }
            Err(e) => {
                error!("Failed to store {}: {}", key, e);
                false
            }
        }
    }

    fn read_string(&self, key: SettingKey, allow_fallback: bool) -> Result<String, StoreError> {
        let stored_len = self
            .storage
            .stored_len(key.id())
            .ok_or(StoreError::Unavailable(key))?;

        let budget = key.budget();
        let fallback = allow_fallback.then(|| stored_len.min(budget));
        let (mut buf, tier) = allocate_two_tier(self.allocator.as_ref(), budget, fallback)
            .ok_or(StoreError::OutOfMemory {
                key,
                requested: budget,
            })?;
        if tier == AllocationTier::Fallback {
            debug!("Reading {} into a {} byte fallback buffer", key, buf.len());
        }

        let copied = self
            .storage
            .read_bytes(key.id(), &mut buf)
            .ok_or(StoreError::Unavailable(key))?;
        // Stop at an embedded terminator, like any C string reader would
        let len = buf[..copied]
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(copied);

        let buf = shrink_to_len(self.allocator.as_ref(), buf, len);
        String::from_utf8(buf).map_err(|_| StoreError::Corrupt(key))
    }

    // --- Light id ---

    /// Store the light identifier.
    ///
    /// Returns `false` if the backend refused the write.
    pub fn write_light_id(&self, id: i8) -> bool {
        match self
            .storage
            .write_i32(SettingKey::LightId.id(), i32::from(id))
        {
            Ok(()) => {
                info!("Stored light id {}", id);
                true
            }
            Err(e) => {
                error!("Failed to store light id: {}", e);
                false
            }
        }
    }

    /// Read the light identifier.
    ///
    /// Never-written, zero and unreadable values all read as
    /// [`LightId::UNSET`].
    pub fn read_light_id(&self) -> LightId {
        self.try_read_light_id().unwrap_or_else(|e| {
            warn!("{}", e);
            LightId::UNSET
        })
    }

    /// Read the light identifier, reporting unreadable values.
    ///
    /// Never-written and zero values are not errors; they read as
    /// [`LightId::UNSET`].
    pub fn try_read_light_id(&self) -> Result<LightId, StoreError> {
        let key = SettingKey::LightId;
        match self.storage.read_i32(key.id()) {
            Ok(Some(raw)) => i8::try_from(raw)
                .map(LightId::new)
                .map_err(|_| StoreError::Corrupt(key)),
            Ok(None) => Ok(LightId::UNSET),
            Err(StorageError::LengthMismatch { .. }) => Err(StoreError::Corrupt(key)),
            Err(e) => Err(StoreError::Backend {
                key,
                reason: e.to_string(),
            }),
        }
    }

    // --- Group operations ---

    /// Read all three settings for a push to the relay.
    ///
    /// An empty address or credential and an unset light id count as
    /// unavailable.
    pub fn read_all(&self) -> Result<BridgeSettings, StoreError> {
        let address = self.read_address()?;
        if address.is_empty() {
            return Err(StoreError::Unavailable(SettingKey::BridgeAddress));
        }

        let credential = self.read_credential()?;
        if credential.is_empty() {
            return Err(StoreError::Unavailable(SettingKey::BridgeCredential));
        }

        let light_id = self.read_light_id();
        if !light_id.is_set() {
            return Err(StoreError::Unavailable(SettingKey::LightId));
        }

        Ok(BridgeSettings {
            address,
            credential,
            light_id,
        })
    }

    /// Delete all cached settings.
    ///
    /// Returns `false` if any key could not be deleted.
    pub fn clear(&self) -> bool {
        let mut ok = true;
        for key in SettingKey::ALL {
            if let Err(e) = self.storage.delete(key.id()) {
                error!("Failed to delete {}: {}", key, e);
                ok = false;
            }
        }
        if ok {
            info!("Cleared cached bridge settings");
        }
        ok
    }
}
