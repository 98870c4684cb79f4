//! Message decoder.
//!
//! A [`Decoder`] is built over one received message. Construction parses the
//! envelope eagerly; afterwards the handler pulls payload fields in encoder
//! order through [`Decoder::decode`] and takes attachments as it meets
//! handle-bearing fields.
//!
//! Parsing rules:
//! - Never index the buffer directly; every read goes through bounds-checked
//!   `get` ranges.
//! - The first failure poisons the decoder. Every later read returns `None`
//!   and leaves the cursor and attachment table untouched.
//! - The cursor only moves forward and never past the end.

pub mod attachment;
pub mod buffer;
pub mod envelope;
pub mod primitive;

use std::any::type_name;
use std::mem::{align_of, size_of};

pub use attachment::Attachment;
pub use buffer::{AlignedBuffer, Deallocator, MessageBuffer, MESSAGE_ALIGNMENT};
pub use envelope::MessageEnvelope;
pub use primitive::{Decode, Primitive};

use crate::error::DecodeError;
use crate::protocol::{
    is_valid_identifier, LegalityPredicate, MessageFlags, MessageName,
    ShouldDispatchWhenWaitingForSyncReply, SyncRequestId,
};

/// Construction-time knobs.
#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions {
    /// Checks non-zero destination ids and every sync request id.
    pub identifier_legality: LegalityPredicate,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            identifier_legality: is_valid_identifier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Valid,
    Invalid,
}

/// Single-owner parser for one received message.
#[derive(Debug)]
pub struct Decoder<'a> {
    buffer: MessageBuffer<'a>,
    cursor: usize,
    state: DecoderState,
    failure: Option<DecodeError>,
    envelope: Option<MessageEnvelope>,
    attachments: Vec<Attachment>,
    objects_decoded: usize,
    nesting: usize,
    failing_object: Option<usize>,
    allowed_when_waiting_override: bool,
}

impl<'a> Decoder<'a> {
    /// General path. The returned decoder may already be invalid.
    pub fn new(buffer: MessageBuffer<'a>, attachments: Vec<Attachment>) -> Self {
        Self::with_options(buffer, attachments, DecoderOptions::default())
    }

    pub fn with_options(
        buffer: MessageBuffer<'a>,
        attachments: Vec<Attachment>,
        options: DecoderOptions,
    ) -> Self {
        let mut decoder = Self::unparsed(buffer, attachments);
        if decoder.check_alignment() {
            decoder.envelope = decoder.decode_envelope(&options);
        }
        decoder
    }

    /// Stream path: a re-serialized message whose destination id is known
    /// out of band. The buffer holds no flags and no destination id.
    pub fn from_stream(buffer: MessageBuffer<'a>, destination_id: u64) -> Self {
        Self::from_stream_with_options(buffer, destination_id, DecoderOptions::default())
    }

    pub fn from_stream_with_options(
        buffer: MessageBuffer<'a>,
        destination_id: u64,
        options: DecoderOptions,
    ) -> Self {
        let mut decoder = Self::unparsed(buffer, Vec::new());
        if decoder.check_alignment() {
            decoder.envelope = decoder.decode_stream_envelope(destination_id, &options);
        }
        decoder
    }

    /// General path, but only hands out decoders whose envelope parsed.
    pub fn create(buffer: MessageBuffer<'a>, attachments: Vec<Attachment>) -> Option<Self> {
        let decoder = Self::new(buffer, attachments);
        if decoder.is_valid() {
            Some(decoder)
        } else {
            None
        }
    }

    /// Zero-copy over `bytes`, which must outlive the decoder.
    pub fn borrowed(bytes: &'a [u8], attachments: Vec<Attachment>) -> Option<Self> {
        Self::create(MessageBuffer::borrowed(bytes), attachments)
    }

    /// Zero-copy over `bytes`; `deallocator` runs once when the decoder drops
    /// (also when no decoder is produced).
    pub fn with_deallocator<F>(
        bytes: &'a [u8],
        deallocator: F,
        attachments: Vec<Attachment>,
    ) -> Option<Self>
    where
        F: FnOnce(&[u8]) + Send + 'a,
    {
        Self::create(MessageBuffer::with_deallocator(bytes, deallocator), attachments)
    }

    /// Zero-copy over transport-owned memory.
    ///
    /// Unlike the other convenience constructors this reports why no decoder
    /// was produced: [`DecodeError::NullBuffer`] for a null `ptr` (the
    /// deallocator is not called), otherwise the envelope failure (the
    /// deallocator has already run).
    ///
    /// # Safety
    /// See [`MessageBuffer::from_raw_parts`].
    pub unsafe fn from_raw_parts<F>(
        ptr: *const u8,
        len: usize,
        deallocator: F,
        attachments: Vec<Attachment>,
    ) -> Result<Self, DecodeError>
    where
        F: FnOnce(&[u8]) + Send + 'a,
    {
        // SAFETY: forwarded caller contract.
        let buffer = unsafe { MessageBuffer::from_raw_parts(ptr, len, deallocator) }?;
        let decoder = Self::new(buffer, attachments);
        let failure = decoder.failure().cloned();
        match failure {
            Some(reason) => Err(reason),
            None => Ok(decoder),
        }
    }

    fn unparsed(buffer: MessageBuffer<'a>, attachments: Vec<Attachment>) -> Self {
        Self {
            buffer,
            cursor: 0,
            state: DecoderState::Valid,
            failure: None,
            envelope: None,
            attachments,
            objects_decoded: 0,
            nesting: 0,
            failing_object: None,
            allowed_when_waiting_override: false,
        }
    }

    fn check_alignment(&mut self) -> bool {
        if self.buffer.is_aligned_to(MESSAGE_ALIGNMENT) {
            return true;
        }
        let address = self.buffer.as_slice().as_ptr() as usize;
        self.fail(DecodeError::Misaligned {
            address,
            required: MESSAGE_ALIGNMENT,
        });
        false
    }

    // --------------------
    // Validity
    // --------------------

    pub fn is_valid(&self) -> bool {
        self.state == DecoderState::Valid
    }

    /// Poison the decoder from outside (e.g. a handler rejecting a value).
    pub fn mark_invalid(&mut self) {
        self.fail(DecodeError::ExternallyInvalidated);
    }

    /// First reason the decoder became invalid.
    pub fn failure(&self) -> Option<&DecodeError> {
        self.failure.as_ref()
    }

    /// Zero-based index of the first top-level [`Decoder::decode`] call that failed.
    pub fn index_of_object_failing_decoding(&self) -> Option<usize> {
        self.failing_object
    }

    pub(crate) fn fail(&mut self, reason: DecodeError) {
        if self.state == DecoderState::Invalid {
            return;
        }
        tracing::debug!(
            error = %reason,
            offset = self.cursor,
            len = self.buffer.len(),
            "message decoder invalidated"
        );
        self.state = DecoderState::Invalid;
        self.failure = Some(reason);
    }

    // --------------------
    // Primitive reader
    // --------------------

    /// Read one `T` at the next `align_of::<T>()` boundary.
    pub fn decode_primitive<T: Primitive>(&mut self) -> Option<T> {
        if !self.is_valid() {
            return None;
        }
        let (start, end) = self.reserve(align_of::<T>(), size_of::<T>())?;
        let value = self
            .buffer
            .as_slice()
            .get(start..end)
            .and_then(|bytes| T::try_read_from_bytes(bytes).ok());
        match value {
            Some(value) => {
                self.cursor = end;
                Some(value)
            }
            None => {
                self.fail(DecodeError::InvalidBitPattern {
                    offset: start,
                    type_name: type_name::<T>(),
                });
                None
            }
        }
    }

    /// Decode a value through its [`Decode`] strategy.
    pub fn decode<T: Decode>(&mut self) -> Option<T> {
        if !self.is_valid() {
            return None;
        }
        let top_level = self.nesting == 0;
        let index = self.objects_decoded;
        if top_level {
            self.objects_decoded += 1;
        }

        self.nesting += 1;
        let value = T::decode(self);
        self.nesting -= 1;

        if value.is_none() {
            self.fail(DecodeError::StrategyFailed {
                type_name: type_name::<T>(),
            });
            if top_level && self.failing_object.is_none() {
                self.failing_object = Some(index);
            }
        }
        value
    }

    /// u64 length prefix, then that many raw bytes.
    pub fn decode_span(&mut self) -> Option<&[u8]> {
        let raw_len: u64 = self.decode_primitive()?;
        let Ok(len) = usize::try_from(raw_len) else {
            self.fail(DecodeError::LengthOverflow(raw_len));
            return None;
        };
        let (start, end) = self.reserve(1, len)?;
        self.cursor = end;
        self.buffer.as_slice().get(start..end)
    }

    // Bounds for the next `size` bytes at an `align` boundary. Fails the
    // decoder when they do not fit.
    fn reserve(&mut self, align: usize, size: usize) -> Option<(usize, usize)> {
        let len = self.buffer.len();
        let bounds = self.cursor.checked_next_multiple_of(align).and_then(|start| {
            start
                .checked_add(size)
                .filter(|end| *end <= len)
                .map(|end| (start, end))
        });
        if bounds.is_none() {
            self.fail(DecodeError::Truncated {
                offset: self.cursor,
                needed: size,
                remaining: len.saturating_sub(self.cursor),
            });
        }
        bounds
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn current_offset(&self) -> usize {
        self.cursor
    }

    pub fn remaining_len(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining_len() == 0
    }

    // --------------------
    // Attachments
    // --------------------

    /// Hand out the most recently appended attachment.
    pub fn take_last_attachment(&mut self) -> Option<Attachment> {
        if !self.is_valid() {
            return None;
        }
        let attachment = self.attachments.pop();
        if attachment.is_none() {
            self.fail(DecodeError::MissingAttachment);
        }
        attachment
    }

    pub fn attachments_remaining(&self) -> usize {
        self.attachments.len()
    }

    // --------------------
    // Envelope
    // --------------------

    /// `None` when header parsing failed.
    pub fn envelope(&self) -> Option<&MessageEnvelope> {
        self.envelope.as_ref()
    }

    pub fn message_name(&self) -> Option<MessageName> {
        self.envelope.map(|e| e.name())
    }

    pub fn destination_id(&self) -> Option<u64> {
        self.envelope.map(|e| e.destination_id())
    }

    pub fn sync_request_id(&self) -> Option<SyncRequestId> {
        self.envelope.and_then(|e| e.sync_request_id())
    }

    pub fn flags(&self) -> MessageFlags {
        self.envelope.map(|e| e.flags()).unwrap_or_default()
    }

    pub fn is_sync_message(&self) -> bool {
        self.message_name().is_some_and(MessageName::is_sync)
    }

    pub fn should_dispatch_message_when_waiting_for_sync_reply(
        &self,
    ) -> ShouldDispatchWhenWaitingForSyncReply {
        self.flags().dispatch_when_waiting()
    }

    pub fn is_allowed_when_waiting_for_sync_reply(&self) -> bool {
        self.allowed_when_waiting_override
            || self
                .message_name()
                .is_some_and(MessageName::allowed_when_waiting_for_sync_reply)
    }

    pub fn is_allowed_when_waiting_for_unbounded_sync_reply(&self) -> bool {
        self.message_name()
            .is_some_and(MessageName::allowed_when_waiting_for_unbounded_sync_reply)
    }

    pub fn should_use_fully_synchronous_mode_for_testing(&self) -> bool {
        self.flags()
            .contains(MessageFlags::USE_FULLY_SYNCHRONOUS_MODE_FOR_TESTING)
    }

    pub fn should_maintain_ordering_with_async_messages(&self) -> bool {
        self.flags()
            .contains(MessageFlags::MAINTAIN_ORDERING_WITH_ASYNC_MESSAGES)
    }

    pub fn set_is_allowed_when_waiting_for_sync_reply_override(&mut self, allowed: bool) {
        self.allowed_when_waiting_override = allowed;
    }

    // --------------------
    // Sync wrapper
    // --------------------

    /// Decode the message wrapped inside a sync wrapper.
    ///
    /// Moves this decoder's attachments to the inner decoder, which owns a
    /// private copy of the wrapped bytes and may be dispatched while a sync
    /// reply is pending. Calling this on a valid non-sync decoder is a
    /// contract violation (debug assertion; otherwise the decoder is
    /// invalidated).
    pub fn unwrap_for_testing(&mut self) -> Option<Decoder<'static>> {
        debug_assert!(
            !self.is_valid() || self.is_sync_message(),
            "unwrap_for_testing called on a non-sync message"
        );
        if !self.is_valid() {
            return None;
        }
        if !self.is_sync_message() {
            self.fail(DecodeError::NotSyncMessage);
            return None;
        }

        let attachments = std::mem::take(&mut self.attachments);
        let wrapped = self.decode_span()?;
        let mut inner = Decoder::copying(wrapped, attachments)?;
        inner.set_is_allowed_when_waiting_for_sync_reply_override(true);
        Some(inner)
    }
}

impl Decoder<'static> {
    /// General path over a private aligned copy of `bytes`.
    pub fn copying(bytes: &[u8], attachments: Vec<Attachment>) -> Option<Self> {
        let buffer = MessageBuffer::copy_from(bytes).ok()?;
        Self::create(buffer, attachments)
    }
}

impl Drop for Decoder<'_> {
    fn drop(&mut self) {
        if self.state == DecoderState::Valid {
            self.state = DecoderState::Invalid;
        } else if !self.attachments.is_empty() {
            tracing::debug!(
                count = self.attachments.len(),
                "disposing untaken attachments of an invalid message"
            );
        }
    }
}
