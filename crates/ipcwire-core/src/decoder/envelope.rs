//! Envelope parsing (flags, name, destination id, sync request id).

use super::{Decode, Decoder, DecoderOptions};
use crate::error::DecodeError;
use crate::protocol::{MessageFlags, MessageName, SyncRequestId};

/// Parsed message header. Only exists when every header field decoded and
/// validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageEnvelope {
    flags: MessageFlags,
    name: MessageName,
    destination_id: u64,
    sync_request_id: Option<SyncRequestId>,
}

impl MessageEnvelope {
    pub fn flags(&self) -> MessageFlags {
        self.flags
    }

    pub fn name(&self) -> MessageName {
        self.name
    }

    /// Routing id; 0 means unrouted.
    pub fn destination_id(&self) -> u64 {
        self.destination_id
    }

    /// Present iff `name().is_sync()`.
    pub fn sync_request_id(&self) -> Option<SyncRequestId> {
        self.sync_request_id
    }
}

impl Decoder<'_> {
    /// General path: flags, name, destination id, then the sync id if any.
    pub(super) fn decode_envelope(&mut self, options: &DecoderOptions) -> Option<MessageEnvelope> {
        let flags = MessageFlags::decode(self)?;
        let name: MessageName = self.decode_primitive()?;
        let destination_id: u64 = self.decode_primitive()?;
        if destination_id != 0 && !(options.identifier_legality)(destination_id) {
            self.fail(DecodeError::IllegalDestination(destination_id));
            return None;
        }
        let sync_request_id = self.decode_sync_request_id(name, options)?;
        Some(MessageEnvelope {
            flags,
            name,
            destination_id,
            sync_request_id,
        })
    }

    /// Stream path: flags and destination id come from outside the buffer.
    pub(super) fn decode_stream_envelope(
        &mut self,
        destination_id: u64,
        options: &DecoderOptions,
    ) -> Option<MessageEnvelope> {
        let name: MessageName = self.decode_primitive()?;
        let sync_request_id = self.decode_sync_request_id(name, options)?;
        Some(MessageEnvelope {
            flags: MessageFlags::empty(),
            name,
            destination_id,
            sync_request_id,
        })
    }

    // Outer None: failure. Inner None: name is not sync-classified.
    fn decode_sync_request_id(
        &mut self,
        name: MessageName,
        options: &DecoderOptions,
    ) -> Option<Option<SyncRequestId>> {
        if !name.is_sync() {
            return Some(None);
        }
        let raw: u64 = self.decode_primitive()?;
        if raw == 0 || !(options.identifier_legality)(raw) {
            self.fail(DecodeError::IllegalSyncRequestId(raw));
            return None;
        }
        Some(Some(SyncRequestId::from_raw(raw)))
    }
}
