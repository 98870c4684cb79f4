use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use ipcwire_core::error::{IpcError, Result};
use ipcwire_core::{DecodeError, Decoder, EncodedMessage, MessageName};

/// What a handler produced for one message.
#[derive(Debug)]
pub enum DispatchResult {
    Handled,
    /// Message to send back to the peer.
    Reply(EncodedMessage),
}

/// Receiver-side handler for one message name.
///
/// The envelope is already parsed when `handle` runs; the handler reads the
/// payload and attachments from the decoder.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn message_name(&self) -> MessageName;
    async fn handle(&self, decoder: &mut Decoder<'_>) -> Result<DispatchResult>;
}

/// Registry and dispatcher keyed by message name.
#[derive(Default)]
pub struct Dispatcher {
    handlers: DashMap<MessageName, Arc<dyn MessageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Later registrations replace earlier ones for the same name.
    pub fn register(&self, handler: Arc<dyn MessageHandler>) {
        self.handlers.insert(handler.message_name(), handler);
    }

    pub fn registered_names(&self) -> Vec<MessageName> {
        let mut names: Vec<MessageName> = self.handlers.iter().map(|e| *e.key()).collect();
        names.sort_by_key(|n| *n as u16);
        names
    }

    pub fn is_registered(&self, name: MessageName) -> bool {
        self.handlers.contains_key(&name)
    }

    pub async fn dispatch(&self, decoder: &mut Decoder<'_>) -> Result<DispatchResult> {
        let name = match decoder.message_name() {
            Some(name) if decoder.is_valid() => name,
            _ => return Err(failure_of(decoder)),
        };

        // Clone out of the map so no shard lock is held across the await.
        let handler = self
            .handlers
            .get(&name)
            .ok_or(IpcError::UnknownHandler(name))?
            .value()
            .clone();

        let result = handler.handle(decoder).await?;
        if !decoder.is_valid() {
            return Err(failure_of(decoder));
        }
        Ok(result)
    }
}

fn failure_of(decoder: &Decoder<'_>) -> IpcError {
    IpcError::Decode(
        decoder
            .failure()
            .cloned()
            .unwrap_or(DecodeError::ExternallyInvalidated),
    )
}
