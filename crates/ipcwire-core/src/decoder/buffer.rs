//! Message buffer ownership.
//!
//! A decoder reads from either a borrowed span (zero-copy, released through a
//! caller-supplied deallocator) or a private 8-byte aligned copy. Release
//! happens exactly once, in `Drop`, on every path.

use std::fmt;

use zerocopy::IntoBytes;

use crate::error::DecodeError;

/// Alignment every message buffer must start on (largest primitive).
pub const MESSAGE_ALIGNMENT: usize = 8;

/// Release callback for a borrowed buffer. Receives the span it guarded.
pub type Deallocator<'a> = Box<dyn FnOnce(&[u8]) + Send + 'a>;

/// Heap bytes whose start is always 8-byte aligned.
pub struct AlignedBuffer {
    words: Vec<u64>,
    len: usize,
}

impl AlignedBuffer {
    /// Copy `bytes` into a fresh aligned allocation.
    ///
    /// Performs one fallible allocation and one bulk copy. Returns `None`
    /// when the allocation cannot be satisfied.
    pub fn try_copy_from(bytes: &[u8]) -> Option<Self> {
        let word_count = bytes.len().div_ceil(MESSAGE_ALIGNMENT);
        let mut words: Vec<u64> = Vec::new();
        words.try_reserve_exact(word_count).ok()?;
        words.resize(word_count, 0);
        words.as_mut_bytes().get_mut(..bytes.len())?.copy_from_slice(bytes);
        Some(Self {
            words,
            len: bytes.len(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.words.as_bytes().get(..self.len).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer").field("len", &self.len).finish()
    }
}

enum Storage<'a> {
    Borrowed(&'a [u8]),
    Owned(AlignedBuffer),
}

/// The byte range a decoder reads from, plus its release obligation.
pub struct MessageBuffer<'a> {
    storage: Storage<'a>,
    deallocator: Option<Deallocator<'a>>,
}

impl<'a> MessageBuffer<'a> {
    /// Borrow `bytes`; the caller guarantees they outlive the decoder.
    pub fn borrowed(bytes: &'a [u8]) -> Self {
        Self {
            storage: Storage::Borrowed(bytes),
            deallocator: None,
        }
    }

    /// Borrow `bytes` and run `deallocator` once when the buffer is dropped.
    pub fn with_deallocator<F>(bytes: &'a [u8], deallocator: F) -> Self
    where
        F: FnOnce(&[u8]) + Send + 'a,
    {
        Self {
            storage: Storage::Borrowed(bytes),
            deallocator: Some(Box::new(deallocator)),
        }
    }

    /// Adopt foreign memory handed over by a transport.
    ///
    /// A null `ptr` is refused with [`DecodeError::NullBuffer`]; the
    /// deallocator is then dropped without being called, since there is no
    /// buffer to release.
    ///
    /// # Safety
    /// A non-null `ptr` must be valid for reads of `len` bytes for `'a` and
    /// the memory must not be mutated during that time.
    pub unsafe fn from_raw_parts<F>(
        ptr: *const u8,
        len: usize,
        deallocator: F,
    ) -> Result<Self, DecodeError>
    where
        F: FnOnce(&[u8]) + Send + 'a,
    {
        if ptr.is_null() {
            tracing::warn!(len, "message buffer handed over as a null pointer");
            return Err(DecodeError::NullBuffer { len });
        }
        // SAFETY: non-null, and the caller guarantees validity for `len` bytes over `'a`.
        let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
        Ok(Self::with_deallocator(bytes, deallocator))
    }

    /// Copy `bytes` into a private aligned allocation.
    pub fn copy_from(bytes: &[u8]) -> Result<MessageBuffer<'static>, DecodeError> {
        match AlignedBuffer::try_copy_from(bytes) {
            Some(owned) => Ok(MessageBuffer::from(owned)),
            None => {
                tracing::error!(len = bytes.len(), "failed to allocate message copy");
                Err(DecodeError::AllocationFailed { len: bytes.len() })
            }
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Storage::Borrowed(bytes) => bytes,
            Storage::Owned(owned) => owned.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Whether the first byte sits on an `align` boundary.
    pub fn is_aligned_to(&self, align: usize) -> bool {
        (self.as_slice().as_ptr() as usize) % align == 0
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }
}

impl From<AlignedBuffer> for MessageBuffer<'static> {
    fn from(owned: AlignedBuffer) -> Self {
        Self {
            storage: Storage::Owned(owned),
            deallocator: None,
        }
    }
}

impl Drop for MessageBuffer<'_> {
    fn drop(&mut self) {
        if let Some(deallocator) = self.deallocator.take() {
            deallocator(self.as_slice());
        }
    }
}

impl fmt::Debug for MessageBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("len", &self.len())
            .field("owned", &self.is_owned())
            .field("has_deallocator", &self.deallocator.is_some())
            .finish()
    }
}
