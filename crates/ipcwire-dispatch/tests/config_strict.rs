#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use ipcwire_dispatch::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
decoder:
  max_mesage_bytes: 4096 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "BAD_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.decoder.max_message_bytes, 1_048_576);
    assert_eq!(cfg.decoder.max_attachments, 64);
    assert!(cfg.decoder.copy_unaligned);
    assert_eq!(cfg.connection.max_invalid_messages, 3);
    assert_eq!(cfg.connection.queue_depth, 256);
}

#[test]
fn ok_full_config() {
    let ok = r#"
version: 1
decoder:
  max_message_bytes: 4096
  max_attachments: 0
  copy_unaligned: false
connection:
  max_invalid_messages: 1
  queue_depth: 8
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.decoder.max_message_bytes, 4096);
    assert_eq!(cfg.decoder.max_attachments, 0);
    assert!(!cfg.decoder.copy_unaligned);
    assert_eq!(cfg.connection.max_invalid_messages, 1);
    assert_eq!(cfg.connection.queue_depth, 8);
}

#[test]
fn unsupported_version_is_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(matches!(err, ipcwire_core::IpcError::UnsupportedVersion));
    assert_eq!(err.class().as_str(), "BAD_CONFIG");
}

#[test]
fn out_of_range_values_are_rejected() {
    for bad in [
        "version: 1\ndecoder: { max_message_bytes: 63 }\n",
        "version: 1\ndecoder: { max_message_bytes: 268435457 }\n",
        "version: 1\ndecoder: { max_attachments: 1025 }\n",
        "version: 1\nconnection: { max_invalid_messages: 0 }\n",
        "version: 1\nconnection: { queue_depth: 65537 }\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.class().as_str(), "BAD_CONFIG", "{bad}");
    }
}

#[test]
fn missing_file_is_internal() {
    let err = config::load_from_file("/nonexistent/ipcwire.yaml").expect_err("must fail");
    assert_eq!(err.class().as_str(), "INTERNAL");
}
