//! Envelope vocabulary: flags, message names and identifiers.
//!
//! Everything here is plain data with a fixed in-memory layout so the
//! decoder can read it through the primitive path. Static properties of a
//! message (sync classification, receiver, dispatch-while-waiting rules) are
//! lookups on [`MessageName`], never data carried on the wire.

pub mod flags;
pub mod identifier;
pub mod name;

pub use flags::{MessageFlags, ShouldDispatchWhenWaitingForSyncReply};
pub use identifier::{is_valid_identifier, LegalityPredicate, SyncRequestId, DELETED_IDENTIFIER};
pub use name::{MessageName, ReceiverName};
