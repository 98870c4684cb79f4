//! Shared receiver-side state.
//!
//! One `Endpoint` serves any number of peers: configuration, the handler
//! registry and metrics are shared, policy counters are per pump.

use std::sync::Arc;

use tokio::sync::mpsc;

use ipcwire_core::error::Result;
use ipcwire_core::EncodedMessage;

use crate::config::DispatchConfig;
use crate::dispatch::Dispatcher;
use crate::obs::DispatchMetrics;
use crate::services::PingHandler;
use crate::transport::{IncomingMessage, MessagePump};

#[derive(Clone)]
pub struct Endpoint {
    cfg: Arc<DispatchConfig>,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<DispatchMetrics>,
}

impl Endpoint {
    /// Build endpoint state with the built-in handlers registered.
    pub fn new(cfg: DispatchConfig) -> Result<Self> {
        cfg.validate()?;

        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(PingHandler::new()));

        tracing::debug!(handlers = ?dispatcher.registered_names(), "endpoint ready");

        Ok(Self {
            cfg: Arc::new(cfg),
            dispatcher: Arc::new(dispatcher),
            metrics: Arc::new(DispatchMetrics::default()),
        })
    }

    pub fn cfg(&self) -> &DispatchConfig {
        &self.cfg
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Inbound channel sized by `connection.queue_depth`.
    pub fn channel(&self) -> (mpsc::Sender<IncomingMessage>, mpsc::Receiver<IncomingMessage>) {
        mpsc::channel(self.cfg.connection.queue_depth)
    }

    pub fn pump(
        &self,
        peer: impl Into<String>,
        inbound: mpsc::Receiver<IncomingMessage>,
        outbound: mpsc::Sender<EncodedMessage>,
    ) -> MessagePump {
        MessagePump::new(self.clone(), peer, inbound, outbound)
    }
}
