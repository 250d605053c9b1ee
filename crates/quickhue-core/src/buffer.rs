//! Fallible buffer allocation for settings reads.
//!
//! Reading a cached setting needs a scratch buffer sized to the setting's
//! budget. On a memory-starved device that allocation can fail, and a failed
//! read must degrade gracefully instead of aborting. [`BufferAllocator`]
//! makes the allocation fallible and injectable, and
//! [`allocate_two_tier`] implements the "try the full size, then a smaller
//! one" strategy.

use tracing::debug;

/// Source of zero-filled scratch buffers that may fail to allocate.
pub trait BufferAllocator: Send + Sync {
    /// Allocate a zero-filled buffer of exactly `len` bytes, or `None` when
    /// memory is not available.
    fn allocate(&self, len: usize) -> Option<Vec<u8>>;
}

/// Heap allocator that reports failure instead of aborting.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, len: usize) -> Option<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).ok()?;
        buf.resize(len, 0);
        Some(buf)
    }
}

/// Which tier an allocation was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationTier {
    Primary,
    Fallback,
}

/// Allocate `primary` bytes, or `fallback` bytes if that fails.
///
/// A `fallback` of `None`, or one not smaller than `primary`, disables the
/// second tier.
pub fn allocate_two_tier(
    allocator: &dyn BufferAllocator,
    primary: usize,
    fallback: Option<usize>,
) -> Option<(Vec<u8>, AllocationTier)> {
    if let Some(buf) = allocator.allocate(primary) {
        return Some((buf, AllocationTier::Primary));
    }

    let fallback = fallback.filter(|len| *len < primary)?;
    debug!(
        "allocation of {} bytes failed, falling back to {} bytes",
        primary, fallback
    );
    allocator
        .allocate(fallback)
        .map(|buf| (buf, AllocationTier::Fallback))
}

/// Shrink `buf` to its first `len` bytes, moving them into a right-sized
/// allocation when one is available.
///
/// If the smaller allocation fails the original buffer is truncated and
/// returned as is, spare capacity included; data is never lost.
pub fn shrink_to_len(allocator: &dyn BufferAllocator, mut buf: Vec<u8>, len: usize) -> Vec<u8> {
    buf.truncate(len);
    if buf.capacity() == len {
        return buf;
    }

    match allocator.allocate(len) {
        Some(mut exact) => {
            exact.copy_from_slice(&buf);
            exact
        }
        None => {
            debug!("down-size to {} bytes failed, keeping {} byte buffer", len, buf.capacity());
            buf
        }
    }
}
