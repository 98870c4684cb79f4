//! Message names and their static descriptions.

use std::fmt;

use zerocopy::{Immutable, IntoBytes, TryFromBytes};

/// Component a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverName {
    /// Connection-level control messages.
    Ipc,
    /// Test and diagnostic messages.
    Test,
    /// Application resource traffic.
    Resource,
}

/// Closed set of message names (u16 on the wire).
///
/// Unknown discriminants are rejected by the primitive reader, so a decoded
/// `MessageName` is always one of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromBytes, IntoBytes, Immutable)]
#[repr(u16)]
pub enum MessageName {
    InitializeConnection = 0,
    SyncMessageReply = 1,
    CancelSyncMessageReply = 2,
    WrappedAsyncMessageForTesting = 3,
    Ping = 4,
    Pong = 5,
    FetchResource = 6,
    TransferHandle = 7,
    SetStreamDestination = 8,
    Terminate = 9,
}

impl MessageName {
    pub const ALL: [MessageName; 10] = [
        MessageName::InitializeConnection,
        MessageName::SyncMessageReply,
        MessageName::CancelSyncMessageReply,
        MessageName::WrappedAsyncMessageForTesting,
        MessageName::Ping,
        MessageName::Pong,
        MessageName::FetchResource,
        MessageName::TransferHandle,
        MessageName::SetStreamDestination,
        MessageName::Terminate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageName::InitializeConnection => "IPC_InitializeConnection",
            MessageName::SyncMessageReply => "IPC_SyncMessageReply",
            MessageName::CancelSyncMessageReply => "IPC_CancelSyncMessageReply",
            MessageName::WrappedAsyncMessageForTesting => "IPC_WrappedAsyncMessageForTesting",
            MessageName::Ping => "Test_Ping",
            MessageName::Pong => "Test_Pong",
            MessageName::FetchResource => "Resource_FetchResource",
            MessageName::TransferHandle => "Resource_TransferHandle",
            MessageName::SetStreamDestination => "IPC_SetStreamDestination",
            MessageName::Terminate => "IPC_Terminate",
        }
    }

    pub fn receiver(self) -> ReceiverName {
        match self {
            MessageName::InitializeConnection
            | MessageName::SyncMessageReply
            | MessageName::CancelSyncMessageReply
            | MessageName::WrappedAsyncMessageForTesting
            | MessageName::SetStreamDestination
            | MessageName::Terminate => ReceiverName::Ipc,
            MessageName::Ping | MessageName::Pong => ReceiverName::Test,
            MessageName::FetchResource | MessageName::TransferHandle => ReceiverName::Resource,
        }
    }

    /// Sender blocks for a reply; the envelope carries a sync request id.
    pub fn is_sync(self) -> bool {
        matches!(
            self,
            MessageName::WrappedAsyncMessageForTesting | MessageName::FetchResource
        )
    }

    pub fn allowed_when_waiting_for_sync_reply(self) -> bool {
        matches!(
            self,
            MessageName::SyncMessageReply
                | MessageName::CancelSyncMessageReply
                | MessageName::Terminate
        )
    }

    pub fn allowed_when_waiting_for_unbounded_sync_reply(self) -> bool {
        self.allowed_when_waiting_for_sync_reply() || matches!(self, MessageName::TransferHandle)
    }
}

impl fmt::Display for MessageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
