//! Integration tests for multicall batching.
//!
//! These live under `tests/` rather than in-crate because they exercise
//! `StubTransport` from `spate-test-support`, which itself depends on
//! `spate-daemon`. An in-crate `#[cfg(test)]` module would compile a
//! second instance of `spate-daemon`, so the stub's `DaemonTransport`
//! impl would not satisfy the bound. An integration test links against
//! the same lib instance the stub was built against.

use spate_daemon::{
    DaemonError, MulticallOutcome, MulticallRequest, batch, expand, map_indexed_rows, map_keyed,
};
use spate_proto::Value;
use spate_test_support::StubTransport;

#[tokio::test]
async fn empty_batch_short_circuits_without_a_call() {
    let transport = StubTransport::new();
    let outcomes = batch(&transport, &[]).await.expect("empty batch");
    assert!(outcomes.is_empty());
    assert!(transport.calls().is_empty(), "no transport call expected");
}

#[tokio::test]
async fn batch_preserves_input_order_and_surfaces_entry_faults() {
    let transport = StubTransport::new();
    transport.respond_with(
        "system.multicall",
        Value::Array(vec![
            Value::Array(vec![Value::Int(1)]),
            Value::Struct(
                [
                    ("faultCode".to_string(), Value::Int(-501)),
                    (
                        "faultString".to_string(),
                        Value::string("Could not find info-hash."),
                    ),
                ]
                .into_iter()
                .collect(),
            ),
        ]),
    );

    let requests = vec![
        MulticallRequest::new("d.start", vec![Value::string("HASH_A")]),
        MulticallRequest::new("d.start", vec![Value::string("HASH_B")]),
    ];
    let outcomes = batch(&transport, &requests).await.expect("batch");
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0], MulticallOutcome::Values(vec![Value::Int(1)]));
    match &outcomes[1] {
        MulticallOutcome::Fault(fault) => assert_eq!(fault.code, -501),
        other => panic!("expected fault outcome, got {other:?}"),
    }

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "system.multicall");
}

#[tokio::test]
async fn arity_mismatch_is_a_protocol_error() {
    let transport = StubTransport::new();
    transport.respond_with("system.multicall", Value::Array(vec![]));
    let requests = vec![MulticallRequest::new("d.stop", vec![])];
    let error = batch(&transport, &requests).await.expect_err("mismatch");
    assert!(matches!(error, DaemonError::Protocol(_)));
}

#[test]
fn expand_builds_the_cartesian_set() {
    let hashes = vec!["A".to_string(), "B".to_string()];
    let indices = vec![0_i64, 1, 2];
    let requests = expand("f.priority.set", &hashes, &indices, |hash, index| {
        vec![Value::string(format!("{hash}:f{index}")), Value::Int(0)]
    });
    assert_eq!(requests.len(), 6);
    assert_eq!(
        requests[0].params[0],
        Value::string("A:f0"),
        "majors iterate outermost"
    );
    assert_eq!(requests[5].params[0], Value::string("B:f2"));
}

#[test]
fn map_keyed_pairs_keys_with_single_values() {
    let outcomes = vec![
        MulticallOutcome::Values(vec![Value::string("/data")]),
        MulticallOutcome::Values(vec![Value::Int(512_000)]),
    ];
    let mapped = map_keyed(&["directory.default", "throttle.down"], outcomes)
        .expect("mapped");
    assert_eq!(
        mapped.get("directory.default"),
        Some(&Value::string("/data"))
    );
    assert_eq!(mapped.get("throttle.down"), Some(&Value::Int(512_000)));
}

#[test]
fn map_indexed_rows_injects_positions() {
    let rows = vec![
        Value::Array(vec![Value::string("peer-a"), Value::Int(100)]),
        Value::Array(vec![Value::string("peer-b"), Value::Int(50)]),
    ];
    let mapped = map_indexed_rows(&["address", "rate"], &rows).expect("mapped");
    assert_eq!(mapped.len(), 2);
    assert_eq!(mapped[0].get("index"), Some(&Value::Int(0)));
    assert_eq!(mapped[1].get("index"), Some(&Value::Int(1)));
    assert_eq!(mapped[1].get("address"), Some(&Value::string("peer-b")));
}
