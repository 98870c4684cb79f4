#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use ipcwire_core::error::{IpcError, Result};
use ipcwire_core::{
    AlignedBuffer, Attachment, Decoder, EncodedMessage, Encoder, FailureClass, MessageName,
    SyncRequestId,
};
use ipcwire_dispatch::config::{self, DispatchConfig};
use ipcwire_dispatch::dispatch::{DispatchResult, Dispatcher, MessageHandler};
use ipcwire_dispatch::endpoint::Endpoint;
use ipcwire_dispatch::policy::{InboundPolicy, PolicyDecision};
use ipcwire_dispatch::transport::{decode_incoming, IncomingMessage, PumpExit};

fn ping(value: u32) -> EncodedMessage {
    let mut encoder = Encoder::new(MessageName::Ping, 7);
    encoder.encode(&value);
    encoder.finish()
}

fn garbage() -> IncomingMessage {
    IncomingMessage::new(Bytes::from_static(&[0xff; 3]), Vec::new())
}

/// Counts `TransferHandle` messages and takes one token each.
#[derive(Default)]
struct CountingHandler {
    seen: AtomicUsize,
}

#[async_trait]
impl MessageHandler for CountingHandler {
    fn message_name(&self) -> MessageName {
        MessageName::TransferHandle
    }

    async fn handle(&self, decoder: &mut Decoder<'_>) -> Result<DispatchResult> {
        let token = decoder
            .take_last_attachment()
            .and_then(|a| a.token())
            .ok_or_else(|| IpcError::InvalidMessage("missing token".into()))?;
        self.seen.fetch_add(token as usize, Ordering::SeqCst);
        Ok(DispatchResult::Handled)
    }
}

/// Always fails without touching the payload.
struct FailingHandler;

#[async_trait]
impl MessageHandler for FailingHandler {
    fn message_name(&self) -> MessageName {
        MessageName::SetStreamDestination
    }

    async fn handle(&self, _decoder: &mut Decoder<'_>) -> Result<DispatchResult> {
        Err(IpcError::Handler("stream table full".into()))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn endpoint_with(yaml: &str) -> Endpoint {
    let cfg = config::load_from_str(yaml).unwrap();
    Endpoint::new(cfg).unwrap()
}

#[tokio::test]
async fn dispatcher_routes_by_name() {
    let dispatcher = Dispatcher::new();
    let counting = Arc::new(CountingHandler::default());
    dispatcher.register(counting.clone());
    assert_eq!(dispatcher.registered_names(), vec![MessageName::TransferHandle]);

    let mut encoder = Encoder::new(MessageName::TransferHandle, 3);
    encoder.add_attachment(Attachment::Token(40));
    let mut decoder = encoder.finish().into_decoder().unwrap();

    let res = dispatcher.dispatch(&mut decoder).await.unwrap();
    assert!(matches!(res, DispatchResult::Handled));
    assert_eq!(counting.seen.load(Ordering::SeqCst), 40);
}

#[tokio::test]
async fn dispatcher_rejects_unknown_and_invalid() {
    let dispatcher = Dispatcher::new();

    let mut decoder = ping(1).into_decoder().unwrap();
    let err = dispatcher.dispatch(&mut decoder).await.unwrap_err();
    assert!(matches!(err, IpcError::UnknownHandler(MessageName::Ping)));
    assert_eq!(err.class(), FailureClass::Dispatch);

    let mut decoder = ping(1).into_decoder().unwrap();
    decoder.mark_invalid();
    let err = dispatcher.dispatch(&mut decoder).await.unwrap_err();
    assert_eq!(err.class(), FailureClass::MalformedInput);
}

#[tokio::test]
async fn handler_leaving_decoder_invalid_is_an_error() {
    struct Overreader;

    #[async_trait]
    impl MessageHandler for Overreader {
        fn message_name(&self) -> MessageName {
            MessageName::Ping
        }

        async fn handle(&self, decoder: &mut Decoder<'_>) -> Result<DispatchResult> {
            let _ = decoder.decode::<u32>();
            let _ = decoder.decode::<u64>();
            Ok(DispatchResult::Handled)
        }
    }

    let dispatcher = Dispatcher::new();
    dispatcher.register(Arc::new(Overreader));
    let mut decoder = ping(1).into_decoder().unwrap();
    let err = dispatcher.dispatch(&mut decoder).await.unwrap_err();
    assert!(matches!(err, IpcError::Decode(_)));
}

#[test]
fn policy_counts_only_malformed_input() {
    let cfg = config::load_from_str(
        "version: 1\ndecoder: { max_message_bytes: 64, max_attachments: 1 }\nconnection: { max_invalid_messages: 2 }\n",
    )
    .unwrap();
    let policy = InboundPolicy::new(&cfg);

    assert_eq!(policy.check_len(64), PolicyDecision::Pass);
    assert!(matches!(policy.check_len(65), PolicyDecision::Terminate { .. }));
    assert_eq!(policy.check_attachments(1), PolicyDecision::Pass);
    assert!(matches!(policy.check_attachments(2), PolicyDecision::Terminate { .. }));

    assert!(matches!(
        policy.record_invalid(FailureClass::ResourceExhaustion),
        PolicyDecision::Drop { .. }
    ));
    assert_eq!(policy.invalid_messages(), 0);
    assert!(matches!(
        policy.record_invalid(FailureClass::MalformedInput),
        PolicyDecision::Drop { .. }
    ));
    assert!(matches!(
        policy.record_invalid(FailureClass::MalformedInput),
        PolicyDecision::Terminate { .. }
    ));
}

#[test]
fn unaligned_input_is_copied_or_rejected() {
    let msg = ping(9);
    let mut staged = vec![0u8; 1];
    staged.extend_from_slice(msg.bytes());
    let source = AlignedBuffer::try_copy_from(&staged).unwrap();
    let shifted = &source.as_bytes()[1..];

    let mut copied = decode_incoming(shifted, Vec::new(), true).unwrap();
    assert!(copied.is_valid());
    assert_eq!(copied.decode::<u32>(), Some(9));

    let rejected = decode_incoming(shifted, Vec::new(), false).unwrap();
    assert!(!rejected.is_valid());
    assert_eq!(rejected.failure().unwrap().class(), FailureClass::MalformedInput);
}

#[tokio::test]
async fn pump_answers_ping_and_closes() {
    init_tracing();
    let endpoint = Endpoint::new(DispatchConfig::default()).unwrap();
    let (in_tx, in_rx) = endpoint.channel();
    let (out_tx, mut out_rx) = mpsc::channel(8);
    let pump = tokio::spawn(endpoint.pump("peer-1", in_rx, out_tx).run());

    in_tx.send(ping(42).into()).await.unwrap();
    let pong = out_rx.recv().await.unwrap();
    let mut decoder = pong.into_decoder().unwrap();
    assert_eq!(decoder.message_name(), Some(MessageName::Pong));
    assert_eq!(decoder.destination_id(), Some(7));
    assert_eq!(decoder.decode::<u32>(), Some(42));

    drop(in_tx);
    assert_eq!(pump.await.unwrap().unwrap(), PumpExit::Closed);

    let metrics = endpoint.metrics();
    assert_eq!(metrics.messages_received.get(&[("name", "Test_Ping")]), 1);
    assert_eq!(metrics.dispatch_duration.count(&[("name", "Test_Ping")]), 1);
    assert_eq!(metrics.active_pumps.get(&[]), 0);
    assert!(metrics.render().contains("ipcwire_messages_received_total{name=\"Test_Ping\"} 1"));
}

#[tokio::test]
async fn pump_unwraps_and_replies_to_wrapped_messages() {
    init_tracing();
    let endpoint = Endpoint::new(DispatchConfig::default()).unwrap();
    let (in_tx, in_rx) = endpoint.channel();
    let (out_tx, mut out_rx) = mpsc::channel(8);
    let pump = tokio::spawn(endpoint.pump("peer-2", in_rx, out_tx).run());

    let sync_id = SyncRequestId::new(77).unwrap();
    let wrapped = Encoder::wrap_for_testing(ping(5), 1, sync_id);
    in_tx.send(wrapped.into()).await.unwrap();

    let mut pong = out_rx.recv().await.unwrap().into_decoder().unwrap();
    assert_eq!(pong.message_name(), Some(MessageName::Pong));
    assert_eq!(pong.decode::<u32>(), Some(5));

    let reply = out_rx.recv().await.unwrap().into_decoder().unwrap();
    assert_eq!(reply.message_name(), Some(MessageName::SyncMessageReply));
    assert_eq!(reply.destination_id(), Some(77));
    assert!(reply.is_at_end());

    drop(in_tx);
    assert_eq!(pump.await.unwrap().unwrap(), PumpExit::Closed);
}

#[tokio::test]
async fn pump_terminates_after_repeated_malformed_messages() {
    init_tracing();
    let endpoint = endpoint_with("version: 1\nconnection: { max_invalid_messages: 3 }\n");
    let (in_tx, in_rx) = endpoint.channel();
    let (out_tx, _out_rx) = mpsc::channel(8);
    let pump = tokio::spawn(endpoint.pump("peer-3", in_rx, out_tx).run());

    for _ in 0..3 {
        in_tx.send(garbage()).await.unwrap();
    }

    let exit = pump.await.unwrap().unwrap();
    assert!(matches!(exit, PumpExit::PeerTerminated { .. }));

    let metrics = endpoint.metrics();
    assert_eq!(metrics.decode_failures.get(&[("class", "MALFORMED_INPUT")]), 3);
    assert_eq!(metrics.messages_received.get(&[("name", "undecoded")]), 3);
    assert_eq!(metrics.policy_decisions.get(&[("decision", "drop")]), 2);
    assert_eq!(metrics.policy_decisions.get(&[("decision", "terminate")]), 1);
}

#[tokio::test]
async fn pump_terminates_on_oversized_message() {
    init_tracing();
    let endpoint = endpoint_with("version: 1\ndecoder: { max_message_bytes: 64 }\n");
    let (in_tx, in_rx) = endpoint.channel();
    let (out_tx, _out_rx) = mpsc::channel(8);
    let pump = tokio::spawn(endpoint.pump("peer-4", in_rx, out_tx).run());

    let mut encoder = Encoder::new(MessageName::Ping, 7);
    encoder.encode_span(&[0u8; 128]);
    in_tx.send(encoder.finish().into()).await.unwrap();

    let exit = pump.await.unwrap().unwrap();
    assert_eq!(
        exit,
        PumpExit::PeerTerminated {
            reason: "message too large"
        }
    );
}

#[tokio::test]
async fn pump_survives_unknown_and_failing_handlers() {
    init_tracing();
    let endpoint = Endpoint::new(DispatchConfig::default()).unwrap();
    endpoint.dispatcher().register(Arc::new(FailingHandler));
    let (in_tx, in_rx) = endpoint.channel();
    let (out_tx, mut out_rx) = mpsc::channel(8);
    let pump = tokio::spawn(endpoint.pump("peer-5", in_rx, out_tx).run());

    in_tx
        .send(Encoder::new(MessageName::Terminate, 0).finish().into())
        .await
        .unwrap();
    in_tx
        .send(Encoder::new(MessageName::SetStreamDestination, 2).finish().into())
        .await
        .unwrap();
    in_tx.send(ping(1).into()).await.unwrap();

    assert!(out_rx.recv().await.is_some());
    drop(in_tx);
    assert_eq!(pump.await.unwrap().unwrap(), PumpExit::Closed);

    let metrics = endpoint.metrics();
    assert_eq!(metrics.unknown_handlers.get(&[("name", "IPC_Terminate")]), 1);
    assert_eq!(metrics.handler_errors.get(&[("name", "IPC_SetStreamDestination")]), 1);
    assert_eq!(metrics.decode_failures.get(&[("class", "MALFORMED_INPUT")]), 0);
}

#[tokio::test]
async fn pump_reports_closed_outbound_channel() {
    init_tracing();
    let endpoint = Endpoint::new(DispatchConfig::default()).unwrap();
    let (in_tx, in_rx) = endpoint.channel();
    let (out_tx, out_rx) = mpsc::channel(1);
    drop(out_rx);
    let pump = tokio::spawn(endpoint.pump("peer-6", in_rx, out_tx).run());

    in_tx.send(ping(3).into()).await.unwrap();
    let err = pump.await.unwrap().unwrap_err();
    assert_eq!(err.class(), FailureClass::Internal);
}
