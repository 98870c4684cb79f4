//! Value decoding: the closed primitive set and per-type strategies.
//!
//! Primitives are read straight out of the buffer, but only for types whose
//! every accepted bit pattern zerocopy can verify (`TryFromBytes`). No
//! constructor or other user code ever runs on peer bytes. Anything richer
//! implements [`Decode`] on top of the primitive, span and attachment reads.

use zerocopy::TryFromBytes;

use super::{Attachment, Decoder};
use crate::error::DecodeError;
use crate::protocol::{MessageFlags, MessageName, SyncRequestId};

mod sealed {
    pub trait Sealed {}
}

/// Types the cursor may read directly from message bytes.
///
/// Closed set. Types with a legality rule beyond their bit pattern (such as
/// [`SyncRequestId`]) are read through [`Decode`] instead:
///
/// ```compile_fail
/// use ipcwire_core::{Decoder, SyncRequestId};
///
/// fn read(decoder: &mut Decoder<'_>) -> Option<SyncRequestId> {
///     decoder.decode_primitive::<SyncRequestId>()
/// }
/// ```
pub trait Primitive: TryFromBytes + Copy + sealed::Sealed {}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Primitive for $ty {}
        )*
    };
}

impl_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, bool, MessageName);

/// Decode strategy for one value type.
///
/// A strategy that returns `None` must leave the decoder invalid, either
/// through a failed primitive, span or attachment read or by invalidating it
/// explicitly. [`Decoder::decode`] additionally poisons the decoder for
/// strategies that do not.
pub trait Decode: Sized {
    fn decode(decoder: &mut Decoder<'_>) -> Option<Self>;
}

macro_rules! impl_decode_for_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode(decoder: &mut Decoder<'_>) -> Option<Self> {
                    decoder.decode_primitive()
                }
            }
        )*
    };
}

impl_decode_for_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, bool, MessageName);

impl Decode for MessageFlags {
    fn decode(decoder: &mut Decoder<'_>) -> Option<Self> {
        let raw: u8 = decoder.decode_primitive()?;
        let flags = MessageFlags::from_bits(raw);
        if flags.is_none() {
            decoder.fail(DecodeError::UnknownFlags(raw));
        }
        flags
    }
}

impl Decode for SyncRequestId {
    fn decode(decoder: &mut Decoder<'_>) -> Option<Self> {
        let raw: u64 = decoder.decode_primitive()?;
        let id = SyncRequestId::new(raw);
        if id.is_none() {
            decoder.fail(DecodeError::IllegalSyncRequestId(raw));
        }
        id
    }
}

impl Decode for Attachment {
    fn decode(decoder: &mut Decoder<'_>) -> Option<Self> {
        decoder.take_last_attachment()
    }
}

impl Decode for Vec<u8> {
    fn decode(decoder: &mut Decoder<'_>) -> Option<Self> {
        decoder.decode_span().map(<[u8]>::to_vec)
    }
}

impl Decode for String {
    fn decode(decoder: &mut Decoder<'_>) -> Option<Self> {
        let parsed = {
            let span = decoder.decode_span()?;
            std::str::from_utf8(span)
                .map(str::to_owned)
                .map_err(|e| span.len() - e.valid_up_to())
        };
        match parsed {
            Ok(s) => Some(s),
            Err(invalid_tail) => {
                let offset = decoder.current_offset().saturating_sub(invalid_tail);
                decoder.fail(DecodeError::InvalidUtf8 { offset });
                None
            }
        }
    }
}

/// `bool` presence tag, then the value when present.
impl<T: Decode> Decode for Option<T> {
    fn decode(decoder: &mut Decoder<'_>) -> Option<Self> {
        let present: bool = decoder.decode()?;
        if present {
            decoder.decode::<T>().map(Some)
        } else {
            Some(None)
        }
    }
}
