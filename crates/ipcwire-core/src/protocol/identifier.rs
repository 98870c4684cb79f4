//! Routing and correlation identifiers.
//!
//! Legality of a raw identifier is a pure predicate so callers can inject a
//! stricter scheme without any process-wide state.

use zerocopy::{Immutable, IntoBytes};

/// Reserved "deleted" marker of the identifier scheme (all bits set).
pub const DELETED_IDENTIFIER: u64 = u64::MAX;

/// Injectable identifier legality check.
pub type LegalityPredicate = fn(u64) -> bool;

/// Default legality predicate: zero and the deleted marker are not identifiers.
///
/// The decoder only consults the predicate for non-zero destination ids, so
/// destination 0 stays usable as the unrouted value.
pub fn is_valid_identifier(raw: u64) -> bool {
    raw != 0 && raw != DELETED_IDENTIFIER
}

/// Correlates a sync request with its eventual reply.
///
/// Always a legal identifier. Not readable as a raw primitive; decoding goes
/// through the legality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoBytes, Immutable)]
#[repr(transparent)]
pub struct SyncRequestId(u64);

impl SyncRequestId {
    /// Wraps `raw` if it is a legal identifier.
    pub fn new(raw: u64) -> Option<Self> {
        is_valid_identifier(raw).then_some(Self(raw))
    }

    /// Caller already checked legality against its own predicate.
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}
