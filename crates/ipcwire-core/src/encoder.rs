//! Envelope encoder.
//!
//! Writes exactly the layout [`Decoder`](crate::Decoder) reads: every value
//! is padded to its own alignment relative to the start of the message, in
//! native byte order. Attachments are collected in append order; the
//! decoder hands them back last-in first-out.

use bytes::{BufMut, Bytes, BytesMut};
use zerocopy::{Immutable, IntoBytes};

use crate::decoder::{Attachment, Decoder};
use crate::protocol::{MessageFlags, MessageName, SyncRequestId};

/// A finished message: bytes plus out-of-band attachments.
#[derive(Debug)]
pub struct EncodedMessage {
    bytes: Bytes,
    attachments: Vec<Attachment>,
}

impl EncodedMessage {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn into_parts(self) -> (Bytes, Vec<Attachment>) {
        (self.bytes, self.attachments)
    }

    /// Decode through the copying path (`Bytes` gives no alignment guarantee).
    pub fn into_decoder(self) -> Option<Decoder<'static>> {
        Decoder::copying(&self.bytes, self.attachments)
    }
}

/// Builder for one outgoing message.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
    attachments: Vec<Attachment>,
    has_flags: bool,
}

impl Encoder {
    /// General-path header for a message that is not sync-classified.
    pub fn new(name: MessageName, destination_id: u64) -> Self {
        debug_assert!(!name.is_sync(), "{name} needs a sync request id");
        Self::with_header(MessageFlags::empty(), name, destination_id, None)
    }

    /// General-path header for a sync-classified message.
    pub fn new_sync(name: MessageName, destination_id: u64, sync_request_id: SyncRequestId) -> Self {
        debug_assert!(name.is_sync(), "{name} is not sync-classified");
        Self::with_header(MessageFlags::empty(), name, destination_id, Some(sync_request_id))
    }

    /// Reply to a sync request, addressed to its request id.
    pub fn reply(sync_request_id: SyncRequestId) -> Self {
        Self::with_header(
            MessageFlags::empty(),
            MessageName::SyncMessageReply,
            sync_request_id.get(),
            None,
        )
    }

    /// Writes the given header fields verbatim, without checking them
    /// against the name's classification.
    pub fn with_header(
        flags: MessageFlags,
        name: MessageName,
        destination_id: u64,
        sync_request_id: Option<SyncRequestId>,
    ) -> Self {
        let mut encoder = Self::raw();
        encoder.encode(&flags.bits());
        encoder.encode(&name);
        encoder.encode(&destination_id);
        if let Some(id) = sync_request_id {
            encoder.encode(&id);
        }
        encoder.has_flags = true;
        encoder
    }

    /// Stream-path header: name and sync id only.
    pub fn for_stream(name: MessageName, sync_request_id: Option<SyncRequestId>) -> Self {
        let mut encoder = Self::raw();
        encoder.encode(&name);
        if let Some(id) = sync_request_id {
            encoder.encode(&id);
        }
        encoder
    }

    /// No header at all.
    pub fn raw() -> Self {
        Self::default()
    }

    /// Embed `inner` in a sync `WrappedAsyncMessageForTesting` message.
    /// The wrapper takes over the inner attachments.
    pub fn wrap_for_testing(
        inner: EncodedMessage,
        destination_id: u64,
        sync_request_id: SyncRequestId,
    ) -> EncodedMessage {
        let (bytes, attachments) = inner.into_parts();
        let mut wrapper = Self::new_sync(
            MessageName::WrappedAsyncMessageForTesting,
            destination_id,
            sync_request_id,
        );
        wrapper.encode_span(&bytes);
        wrapper.attachments = attachments;
        wrapper.finish()
    }

    /// Replace the flag byte of a general-path header. Stream and raw
    /// encoders carry no flag byte.
    pub fn set_flags(&mut self, flags: MessageFlags) -> &mut Self {
        debug_assert!(self.has_flags, "set_flags on an encoder without a flag byte");
        if self.has_flags {
            if let Some(first) = self.buf.first_mut() {
                *first = flags.bits();
            }
        }
        self
    }

    pub fn encode<T: IntoBytes + Immutable>(&mut self, value: &T) -> &mut Self {
        self.pad_to(std::mem::align_of::<T>());
        self.buf.put_slice(value.as_bytes());
        self
    }

    /// u64 length prefix followed by the raw bytes.
    pub fn encode_span(&mut self, bytes: &[u8]) -> &mut Self {
        self.encode(&(bytes.len() as u64));
        self.buf.put_slice(bytes);
        self
    }

    pub fn encode_str(&mut self, s: &str) -> &mut Self {
        self.encode_span(s.as_bytes())
    }

    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> EncodedMessage {
        EncodedMessage {
            bytes: self.buf.freeze(),
            attachments: self.attachments,
        }
    }

    fn pad_to(&mut self, align: usize) {
        let pad = self.buf.len().next_multiple_of(align) - self.buf.len();
        self.buf.put_bytes(0, pad);
    }
}
