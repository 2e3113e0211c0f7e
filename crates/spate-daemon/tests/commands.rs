//! Integration tests for the typed command surface.
//!
//! These use `StubTransport` from `spate-test-support`, which depends on
//! `spate-daemon`; running them in-crate would compile a second instance
//! of `spate-daemon` and the stub's `DaemonTransport` impl would not
//! satisfy the bound. Tests that exercise only private helpers stay in
//! the crate's own `#[cfg(test)]` module.

use std::sync::Arc;

use spate_daemon::{DaemonClient, DaemonError};
use spate_proto::Value;
use spate_test_support::{StubTransport, torrent_row};

fn client(transport: &StubTransport) -> DaemonClient {
    DaemonClient::new(Arc::new(transport.clone()))
}

#[tokio::test]
async fn poll_parses_rows_and_merges_trackers() {
    let transport = StubTransport::new();
    transport.respond_with(
        "d.multicall2",
        Value::Array(vec![torrent_row("HASH_A", 500, 1_000)]),
    );
    // One t.multicall entry wrapping one tracker row.
    transport.respond_with(
        "system.multicall",
        Value::Array(vec![Value::Array(vec![Value::Array(vec![Value::Array(
            vec![Value::string("https://tracker.example.org/announce")],
        )])])]),
    );

    let raws = client(&transport).poll().await.expect("poll");
    assert_eq!(raws.len(), 1);
    let raw = &raws[0];
    assert_eq!(raw.hash, "HASH_A");
    assert_eq!(raw.bytes_done, 500);
    assert_eq!(raw.size_bytes, 1_000);
    assert_eq!(
        raw.trackers,
        vec!["https://tracker.example.org/announce".to_string()]
    );

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, "d.multicall2");
    assert_eq!(calls[1].method, "system.multicall");
}

#[tokio::test]
async fn start_opens_then_starts_each_hash() {
    let transport = StubTransport::new();
    transport.respond_with(
        "system.multicall",
        Value::Array(vec![
            Value::Array(vec![Value::Int(0)]),
            Value::Array(vec![Value::Int(0)]),
        ]),
    );

    client(&transport)
        .start_torrents(&["HASH_A".to_string()])
        .await
        .expect("start");

    let batched = transport.batched_methods();
    assert_eq!(batched, vec!["d.open".to_string(), "d.start".to_string()]);
}

#[tokio::test]
async fn file_priority_expands_the_cartesian_set() {
    let transport = StubTransport::new();
    let entries: Vec<Value> = (0..6).map(|_| Value::Array(vec![Value::Int(0)])).collect();
    transport.respond_with("system.multicall", Value::Array(entries));

    client(&transport)
        .set_file_priority(
            &["A".to_string(), "B".to_string()],
            &[3, 7],
            0,
        )
        .await
        .expect("set priority");

    let batched = transport.batched_methods();
    assert_eq!(
        batched,
        vec![
            "f.priority.set".to_string(),
            "f.priority.set".to_string(),
            "f.priority.set".to_string(),
            "f.priority.set".to_string(),
            "d.update_priorities".to_string(),
            "d.update_priorities".to_string(),
        ]
    );
}

#[tokio::test]
async fn command_faults_propagate_untouched() {
    let transport = StubTransport::new();
    transport.respond_with(
        "system.multicall",
        Value::Array(vec![Value::Struct(
            [
                ("faultCode".to_string(), Value::Int(-501)),
                (
                    "faultString".to_string(),
                    Value::string("Could not find info-hash."),
                ),
            ]
            .into_iter()
            .collect(),
        )]),
    );

    let error = client(&transport)
        .check_torrents(&["MISSING".to_string()])
        .await
        .expect_err("fault expected");
    match error {
        DaemonError::Fault(fault) => {
            assert_eq!(fault.code, -501);
            assert_eq!(fault.message, "Could not find info-hash.");
        }
        other => panic!("expected daemon fault, got {other}"),
    }
}

#[tokio::test]
async fn empty_command_lists_issue_no_calls() {
    let transport = StubTransport::new();
    client(&transport)
        .check_torrents(&[])
        .await
        .expect("empty command");
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn settings_fetch_maps_keyed_values() {
    let transport = StubTransport::new();
    transport.respond_with(
        "system.multicall",
        Value::Array(vec![
            Value::Array(vec![Value::string("/data/downloads")]),
            Value::Array(vec![Value::string("6881-6999")]),
            Value::Array(vec![Value::Int(512_000)]),
            Value::Array(vec![Value::Int(0)]),
        ]),
    );

    let settings = client(&transport).fetch_settings().await.expect("settings");
    assert_eq!(settings.default_directory, "/data/downloads");
    assert_eq!(settings.port_range, "6881-6999");
    assert_eq!(settings.down_throttle_max, 512_000);
    assert_eq!(settings.up_throttle_max, 0);
}
