//! Receive path.
//!
//! The transport (socket, pipe, shared memory) lives outside this crate and
//! hands over each message as an [`IncomingMessage`] through a channel. The
//! pump applies policy, decodes once, and dispatches.

pub mod inbound;
pub mod pump;

pub use inbound::{decode_incoming, IncomingMessage};
pub use pump::{MessagePump, PumpExit};
