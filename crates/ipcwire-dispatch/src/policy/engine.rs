use std::sync::atomic::{AtomicU32, Ordering};

use ipcwire_core::FailureClass;

use crate::config::schema::DispatchConfig;

/// Decision from policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Pass,
    /// Discard this message, keep the peer.
    Drop { reason: &'static str },
    /// Stop receiving from the peer.
    Terminate { reason: &'static str },
}

impl PolicyDecision {
    /// Label used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyDecision::Pass => "pass",
            PolicyDecision::Drop { .. } => "drop",
            PolicyDecision::Terminate { .. } => "terminate",
        }
    }
}

/// Per-connection inbound policy.
#[derive(Debug)]
pub struct InboundPolicy {
    max_message_bytes: usize,
    max_attachments: usize,
    max_invalid_messages: u32,
    invalid_messages: AtomicU32,
}

impl InboundPolicy {
    pub fn new(cfg: &DispatchConfig) -> Self {
        Self {
            max_message_bytes: cfg.decoder.max_message_bytes,
            max_attachments: cfg.decoder.max_attachments,
            max_invalid_messages: cfg.connection.max_invalid_messages,
            invalid_messages: AtomicU32::new(0),
        }
    }

    /// Cheap check before any decoding.
    pub fn check_len(&self, bytes_len: usize) -> PolicyDecision {
        if bytes_len > self.max_message_bytes {
            return PolicyDecision::Terminate {
                reason: "message too large",
            };
        }
        PolicyDecision::Pass
    }

    pub fn check_attachments(&self, count: usize) -> PolicyDecision {
        if count > self.max_attachments {
            return PolicyDecision::Terminate {
                reason: "too many attachments",
            };
        }
        PolicyDecision::Pass
    }

    /// Account one message that failed to decode or dispatch.
    ///
    /// Only malformed input counts towards termination; local resource
    /// exhaustion is not the peer's fault.
    pub fn record_invalid(&self, class: FailureClass) -> PolicyDecision {
        if class != FailureClass::MalformedInput {
            return PolicyDecision::Drop {
                reason: class.as_str(),
            };
        }

        let seen = self.invalid_messages.fetch_add(1, Ordering::Relaxed) + 1;
        if seen >= self.max_invalid_messages {
            PolicyDecision::Terminate {
                reason: "too many malformed messages",
            }
        } else {
            PolicyDecision::Drop {
                reason: "malformed message",
            }
        }
    }

    pub fn invalid_messages(&self) -> u32 {
        self.invalid_messages.load(Ordering::Relaxed)
    }
}
