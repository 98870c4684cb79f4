use async_trait::async_trait;

use ipcwire_core::error::{IpcError, Result};
use ipcwire_core::{Decoder, Encoder, MessageName};

use crate::dispatch::{DispatchResult, MessageHandler};

/// Answers `Ping(u32)` with `Pong(u32)` carrying the same value, addressed
/// to the ping's destination.
#[derive(Debug, Default)]
pub struct PingHandler;

impl PingHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageHandler for PingHandler {
    fn message_name(&self) -> MessageName {
        MessageName::Ping
    }

    async fn handle(&self, decoder: &mut Decoder<'_>) -> Result<DispatchResult> {
        let destination_id = decoder.destination_id().unwrap_or(0);
        let value = decoder
            .decode::<u32>()
            .ok_or_else(|| IpcError::InvalidMessage("ping payload missing".into()))?;

        let mut pong = Encoder::new(MessageName::Pong, destination_id);
        pong.encode(&value);
        Ok(DispatchResult::Reply(pong.finish()))
    }
}
