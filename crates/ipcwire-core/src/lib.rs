//! ipcwire core: the inter-process message decoder and its wire primitives.
//!
//! This crate reconstructs typed messages from byte buffers received from
//! another process. It owns the envelope format (flags, message name,
//! destination id, optional sync-request id), the forward-only primitive
//! reader, the out-of-band attachment table and the error surface shared by
//! the dispatch layer. It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed input never panics: it poisons the decoder and every further
//! read returns `None`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod protocol;

pub use decoder::{
    AlignedBuffer, Attachment, Decode, Decoder, DecoderOptions, MessageBuffer, MessageEnvelope,
    Primitive,
};
pub use encoder::{EncodedMessage, Encoder};
pub use error::{DecodeError, FailureClass, IpcError, Result};
pub use protocol::{MessageFlags, MessageName, ReceiverName, SyncRequestId};
