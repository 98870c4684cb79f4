//! Shared error types across ipcwire crates.

use thiserror::Error;

use crate::protocol::MessageName;

/// Stable classification of a failure (used for policy and metrics labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Peer sent bytes or handles that do not form a valid message.
    MalformedInput,
    /// Local allocation failed while staging the message.
    ResourceExhaustion,
    /// Caller broke an API precondition.
    ContractViolation,
    /// Invalid local configuration.
    BadConfig,
    /// No handler or handler-side failure.
    Dispatch,
    /// Internal error.
    Internal,
}

impl FailureClass {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureClass::MalformedInput => "MALFORMED_INPUT",
            FailureClass::ResourceExhaustion => "RESOURCE_EXHAUSTION",
            FailureClass::ContractViolation => "CONTRACT_VIOLATION",
            FailureClass::BadConfig => "BAD_CONFIG",
            FailureClass::Dispatch => "DISPATCH",
            FailureClass::Internal => "INTERNAL",
        }
    }
}

/// Why a decoder became invalid. Only the first reason is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("null message buffer (len {len})")]
    NullBuffer { len: usize },
    #[error("message buffer at {address:#x} is not {required}-byte aligned")]
    Misaligned { address: usize, required: usize },
    #[error("truncated: need {needed} bytes at offset {offset}, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("invalid bit pattern for {type_name} at offset {offset}")]
    InvalidBitPattern {
        offset: usize,
        type_name: &'static str,
    },
    #[error("unknown message flag bits {0:#04x}")]
    UnknownFlags(u8),
    #[error("illegal destination id {0:#x}")]
    IllegalDestination(u64),
    #[error("illegal sync request id {0:#x}")]
    IllegalSyncRequestId(u64),
    #[error("span length {0} does not fit in memory")]
    LengthOverflow(u64),
    #[error("attachment table is empty")]
    MissingAttachment,
    #[error("allocation of {len} bytes for message copy failed")]
    AllocationFailed { len: usize },
    #[error("decoder is not a sync message wrapper")]
    NotSyncMessage,
    #[error("invalid utf-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("decode strategy for {type_name} failed")]
    StrategyFailed { type_name: &'static str },
    #[error("decoder invalidated by caller")]
    ExternallyInvalidated,
}

impl DecodeError {
    /// Map the failure to its stable class.
    pub fn class(&self) -> FailureClass {
        match self {
            DecodeError::AllocationFailed { .. } => FailureClass::ResourceExhaustion,
            DecodeError::NullBuffer { .. } | DecodeError::NotSyncMessage => {
                FailureClass::ContractViolation
            }
            _ => FailureClass::MalformedInput,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, IpcError>;

/// Unified error type used by core and dispatch.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("no handler registered for {0:?}")]
    UnknownHandler(MessageName),
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl IpcError {
    /// Map error to its stable class.
    pub fn class(&self) -> FailureClass {
        match self {
            IpcError::Decode(e) => e.class(),
            IpcError::InvalidMessage(_) => FailureClass::MalformedInput,
            IpcError::BadConfig(_) | IpcError::UnsupportedVersion => FailureClass::BadConfig,
            IpcError::UnknownHandler(_) | IpcError::Handler(_) => FailureClass::Dispatch,
            IpcError::Internal(_) => FailureClass::Internal,
        }
    }
}
