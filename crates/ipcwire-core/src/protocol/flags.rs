//! Message flag set (first byte of every general-path envelope).

use bitflags::bitflags;

bitflags! {
    /// Dispatch policy bits carried in the envelope.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MessageFlags: u8 {
        /// Receiver may dispatch this message while blocked on a sync reply.
        const DISPATCH_MESSAGE_WHEN_WAITING_FOR_SYNC_REPLY = 1 << 0;
        /// Same, but only while blocked on an unbounded sync reply.
        const DISPATCH_MESSAGE_WHEN_WAITING_FOR_UNBOUNDED_SYNC_REPLY = 1 << 1;
        const USE_FULLY_SYNCHRONOUS_MODE_FOR_TESTING = 1 << 2;
        const MAINTAIN_ORDERING_WITH_ASYNC_MESSAGES = 1 << 3;
    }
}

/// Whether a message may be dispatched while the receiver waits for a sync reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShouldDispatchWhenWaitingForSyncReply {
    No,
    Yes,
    YesDuringUnboundedIpc,
}

impl MessageFlags {
    /// Policy derived from the two dispatch-while-waiting bits.
    pub fn dispatch_when_waiting(self) -> ShouldDispatchWhenWaitingForSyncReply {
        if self.contains(MessageFlags::DISPATCH_MESSAGE_WHEN_WAITING_FOR_SYNC_REPLY) {
            ShouldDispatchWhenWaitingForSyncReply::Yes
        } else if self.contains(MessageFlags::DISPATCH_MESSAGE_WHEN_WAITING_FOR_UNBOUNDED_SYNC_REPLY)
        {
            ShouldDispatchWhenWaitingForSyncReply::YesDuringUnboundedIpc
        } else {
            ShouldDispatchWhenWaitingForSyncReply::No
        }
    }
}
