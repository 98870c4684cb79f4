use bytes::Bytes;

use ipcwire_core::{Attachment, DecodeError, Decoder, EncodedMessage, MessageBuffer};
use ipcwire_core::decoder::MESSAGE_ALIGNMENT;

/// One message as received from the transport.
#[derive(Debug)]
pub struct IncomingMessage {
    pub bytes: Bytes,
    pub attachments: Vec<Attachment>,
}

impl IncomingMessage {
    pub fn new(bytes: Bytes, attachments: Vec<Attachment>) -> Self {
        Self { bytes, attachments }
    }
}

impl From<EncodedMessage> for IncomingMessage {
    fn from(msg: EncodedMessage) -> Self {
        let (bytes, attachments) = msg.into_parts();
        Self { bytes, attachments }
    }
}

/// Build a decoder over received bytes.
///
/// Aligned buffers are decoded in place. Unaligned buffers are copied into
/// aligned storage when `copy_unaligned` is set and otherwise fail the
/// alignment gate. The returned decoder may be invalid; `Err` is only
/// returned when the copy could not be allocated.
pub fn decode_incoming(
    bytes: &[u8],
    attachments: Vec<Attachment>,
    copy_unaligned: bool,
) -> Result<Decoder<'_>, DecodeError> {
    let buffer = MessageBuffer::borrowed(bytes);
    if buffer.is_aligned_to(MESSAGE_ALIGNMENT) || !copy_unaligned {
        return Ok(Decoder::new(buffer, attachments));
    }

    tracing::trace!(len = bytes.len(), "copying unaligned message");
    let owned = MessageBuffer::copy_from(bytes)?;
    Ok(Decoder::new(owned, attachments))
}
