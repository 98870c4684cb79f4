//! Per-peer receive loop.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::Instrument;

use ipcwire_core::error::{IpcError, Result};
use ipcwire_core::{Decoder, EncodedMessage, Encoder, FailureClass, MessageName};

use crate::dispatch::DispatchResult;
use crate::endpoint::Endpoint;
use crate::policy::{InboundPolicy, PolicyDecision};

use super::inbound::{decode_incoming, IncomingMessage};

/// Why a pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpExit {
    /// Inbound channel closed by the transport.
    Closed,
    /// Policy gave up on the peer.
    PeerTerminated { reason: &'static str },
}

enum Step {
    Continue,
    Terminate(&'static str),
}

/// Consumes one peer's inbound channel until it closes or the peer is
/// terminated. Replies go out on `outbound`.
pub struct MessagePump {
    endpoint: Endpoint,
    policy: InboundPolicy,
    peer: String,
    inbound: mpsc::Receiver<IncomingMessage>,
    outbound: mpsc::Sender<EncodedMessage>,
}

impl MessagePump {
    pub fn new(
        endpoint: Endpoint,
        peer: impl Into<String>,
        inbound: mpsc::Receiver<IncomingMessage>,
        outbound: mpsc::Sender<EncodedMessage>,
    ) -> Self {
        let policy = InboundPolicy::new(endpoint.cfg());
        Self {
            endpoint,
            policy,
            peer: peer.into(),
            inbound,
            outbound,
        }
    }

    /// Fails only when the outbound channel is gone.
    pub async fn run(self) -> Result<PumpExit> {
        let span = tracing::info_span!("pump", peer = %self.peer);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) -> Result<PumpExit> {
        let metrics = self.endpoint.metrics();
        metrics.active_pumps.inc(&[]);
        tracing::info!("pump started");

        let exit = loop {
            let Some(msg) = self.inbound.recv().await else {
                break Ok(PumpExit::Closed);
            };
            match self.process(msg).await {
                Ok(Step::Continue) => {}
                Ok(Step::Terminate(reason)) => {
                    tracing::warn!(reason, "terminating peer");
                    break Ok(PumpExit::PeerTerminated { reason });
                }
                Err(e) => break Err(e),
            }
        };

        metrics.active_pumps.dec(&[]);
        tracing::info!(exit = ?exit, "pump stopped");
        exit
    }

    async fn process(&self, msg: IncomingMessage) -> Result<Step> {
        let IncomingMessage { bytes, attachments } = msg;

        // cheap-first: limits before any decoding
        if let Some(step) = self.apply(self.policy.check_len(bytes.len())) {
            return Ok(step);
        }
        if let Some(step) = self.apply(self.policy.check_attachments(attachments.len())) {
            return Ok(step);
        }

        let copy_unaligned = self.endpoint.cfg().decoder.copy_unaligned;
        let mut decoder = match decode_incoming(&bytes, attachments, copy_unaligned) {
            Ok(decoder) => decoder,
            Err(e) => {
                tracing::error!(error = %e, "could not stage message");
                return Ok(self.on_invalid(e.class()));
            }
        };

        let name = match decoder.message_name() {
            Some(name) if decoder.is_valid() => name,
            _ => {
                self.count_received("undecoded");
                return Ok(self.on_invalid(failure_class(&decoder)));
            }
        };
        self.count_received(name.as_str());

        if name == MessageName::WrappedAsyncMessageForTesting {
            return self.process_wrapped(&mut decoder).await;
        }
        self.dispatch(&mut decoder, name).await
    }

    async fn process_wrapped(&self, decoder: &mut Decoder<'_>) -> Result<Step> {
        let Some(sync_request_id) = decoder.sync_request_id() else {
            return Ok(self.on_invalid(failure_class(decoder)));
        };
        let Some(mut inner) = decoder.unwrap_for_testing() else {
            return Ok(self.on_invalid(failure_class(decoder)));
        };
        let Some(inner_name) = inner.message_name() else {
            return Ok(self.on_invalid(failure_class(&inner)));
        };
        tracing::debug!(inner = %inner_name, "dispatching wrapped message");

        let step = self.dispatch(&mut inner, inner_name).await?;
        drop(inner);

        self.send(Encoder::reply(sync_request_id).finish()).await?;
        Ok(step)
    }

    async fn dispatch(&self, decoder: &mut Decoder<'_>, name: MessageName) -> Result<Step> {
        let metrics = self.endpoint.metrics();
        let dispatcher = self.endpoint.dispatcher();

        let started = Instant::now();
        let res = dispatcher.dispatch(decoder).await;
        metrics
            .dispatch_duration
            .observe(&[("name", name.as_str())], started.elapsed());

        match res {
            Ok(DispatchResult::Handled) => Ok(Step::Continue),
            Ok(DispatchResult::Reply(reply)) => {
                self.send(reply).await?;
                Ok(Step::Continue)
            }
            Err(IpcError::UnknownHandler(name)) => {
                metrics.unknown_handlers.inc(&[("name", name.as_str())]);
                tracing::warn!(%name, "no handler registered");
                Ok(Step::Continue)
            }
            Err(e) if e.class() == FailureClass::MalformedInput => {
                tracing::debug!(%name, error = %e, "handler rejected payload");
                Ok(self.on_invalid(e.class()))
            }
            Err(e) => {
                metrics.handler_errors.inc(&[("name", name.as_str())]);
                tracing::warn!(%name, error = %e, "handler failed");
                Ok(Step::Continue)
            }
        }
    }

    fn on_invalid(&self, class: FailureClass) -> Step {
        self.endpoint
            .metrics()
            .decode_failures
            .inc(&[("class", class.as_str())]);
        let decision = self.policy.record_invalid(class);
        self.apply(decision).unwrap_or(Step::Continue)
    }

    /// `None` means the message may proceed.
    fn apply(&self, decision: PolicyDecision) -> Option<Step> {
        if decision == PolicyDecision::Pass {
            return None;
        }
        self.endpoint
            .metrics()
            .policy_decisions
            .inc(&[("decision", decision.as_str())]);
        match decision {
            PolicyDecision::Pass => None,
            PolicyDecision::Drop { reason } => {
                tracing::debug!(reason, "message dropped");
                Some(Step::Continue)
            }
            PolicyDecision::Terminate { reason } => Some(Step::Terminate(reason)),
        }
    }

    fn count_received(&self, name: &str) {
        self.endpoint
            .metrics()
            .messages_received
            .inc(&[("name", name)]);
    }

    async fn send(&self, msg: EncodedMessage) -> Result<()> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| IpcError::Internal("outbound channel closed".into()))
    }
}

fn failure_class(decoder: &Decoder<'_>) -> FailureClass {
    decoder
        .failure()
        .map(|e| e.class())
        .unwrap_or(FailureClass::MalformedInput)
}
