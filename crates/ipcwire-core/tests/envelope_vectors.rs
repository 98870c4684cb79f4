//! Envelope vector tests (little-endian wire captures).

#![cfg(target_endian = "little")]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use ipcwire_core::{Decoder, MessageBuffer};

use vector_loader::load;

#[test]
fn envelope_vectors() {
    let files = [
        "ping_ok.json",
        "ping_base64.json",
        "fetch_sync_unrouted.json",
        "deleted_destination.json",
        "unknown_name.json",
        "unknown_flags.json",
        "truncated_destination.json",
        "sync_missing_request_id.json",
        "sync_zero_request_id.json",
    ];

    for f in files {
        let v = load(f);
        let raw = v.message.decode();
        let decoder = Decoder::new(MessageBuffer::copy_from(&raw).unwrap(), Vec::new());

        if let Some(err) = v.expect_error {
            assert!(!decoder.is_valid(), "vector={}", v.description);
            assert!(decoder.envelope().is_none(), "vector={}", v.description);
            let failure = decoder.failure().expect("invalid decoder keeps its reason");
            assert_eq!(failure.class().as_str(), err.code, "vector={}", v.description);
            assert!(
                format!("{failure:?}").starts_with(&err.reason),
                "vector={} got {failure:?}",
                v.description
            );
            continue;
        }

        assert!(decoder.is_valid(), "vector={} failure={:?}", v.description, decoder.failure());
        let ex = v.expect.expect("missing expect block");
        let env = decoder.envelope().unwrap();

        assert_eq!(env.flags().bits() as u64, ex["flags"].as_u64().unwrap(), "vector={}", v.description);
        assert_eq!(env.name() as u64, ex["name"].as_u64().unwrap(), "vector={}", v.description);
        assert_eq!(env.destination_id(), ex["destination_id"].as_u64().unwrap(), "vector={}", v.description);

        if ex.get("sync_request_id").is_some() && !ex["sync_request_id"].is_null() {
            assert_eq!(
                env.sync_request_id().unwrap().get(),
                ex["sync_request_id"].as_u64().unwrap(),
                "vector={}",
                v.description
            );
        } else {
            assert!(env.sync_request_id().is_none(), "vector={}", v.description);
        }

        assert_eq!(decoder.current_offset() as u64, ex["header_len"].as_u64().unwrap(), "vector={}", v.description);
        assert_eq!(decoder.remaining_len() as u64, ex["payload_len"].as_u64().unwrap(), "vector={}", v.description);
    }
}
