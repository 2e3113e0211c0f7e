//! Scripted transport stand-ins.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use spate_daemon::{DaemonError, DaemonTransport, TransportError};
use spate_proto::Value;

/// One call observed by the stub, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Remote method name.
    pub method: String,
    /// Parameters exactly as passed.
    pub params: Vec<Value>,
}

#[derive(Default)]
struct StubState {
    responses: HashMap<String, VecDeque<Value>>,
    calls: Vec<RecordedCall>,
    refuse: Option<(String, Option<u16>)>,
}

/// Scripted [`DaemonTransport`] for tests.
///
/// Responses are queued per method; the final queued response sticks and
/// is replayed for every later call, so a single `respond_with` covers
/// repeated polling. A `system.multicall` with no explicit script is
/// synthesized entry-by-entry: each inner call answers with its own
/// scripted response (or `0` when unscripted), wrapped in the
/// single-element result array the protocol prescribes. Calls against
/// other unscripted methods panic to surface test mistakes immediately.
#[derive(Clone, Default)]
pub struct StubTransport {
    state: Arc<Mutex<StubState>>,
}

impl StubTransport {
    /// Fresh stub with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the given method.
    pub fn respond_with(&self, method: &str, response: Value) {
        self.lock()
            .responses
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Make every subsequent call fail as if the daemon refused the
    /// connection at the given endpoint.
    pub fn refuse_connections(&self, address: &str, port: Option<u16>) {
        self.lock().refuse = Some((address.to_string(), port));
    }

    /// Lift a previous [`Self::refuse_connections`].
    pub fn restore_connections(&self) {
        self.lock().refuse = None;
    }

    /// All calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Inner method names of every observed `system.multicall`, in
    /// batch order.
    #[must_use]
    pub fn batched_methods(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|call| call.method == "system.multicall")
            .flat_map(|call| {
                call.params
                    .first()
                    .and_then(Value::as_array)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(Value::as_struct)
                            .filter_map(|members| members.get("methodName"))
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().expect("stub transport mutex poisoned")
    }
}

#[async_trait]
impl DaemonTransport for StubTransport {
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, DaemonError> {
        let mut state = self.lock();
        if let Some((address, port)) = &state.refuse {
            return Err(DaemonError::Transport(TransportError {
                address: address.clone(),
                port: *port,
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            }));
        }

        state.calls.push(RecordedCall {
            method: method.to_string(),
            params: params.to_vec(),
        });

        if let Some(queue) = state.responses.get_mut(method) {
            let response = if queue.len() > 1 {
                queue.pop_front().expect("non-empty queue")
            } else {
                queue
                    .front()
                    .cloned()
                    .unwrap_or_else(|| panic!("response queue for '{method}' drained"))
            };
            return Ok(response);
        }

        if method == "system.multicall" {
            return Ok(synthesize_multicall(&state, params));
        }
        panic!("unscripted method '{method}' called on stub transport");
    }
}

fn synthesize_multicall(state: &StubState, params: &[Value]) -> Value {
    let entries = params
        .first()
        .and_then(Value::as_array)
        .unwrap_or_default();
    let results = entries
        .iter()
        .map(|entry| {
            let inner = entry
                .as_struct()
                .and_then(|members| members.get("methodName"))
                .and_then(Value::as_str)
                .unwrap_or("");
            let value = state
                .responses
                .get(inner)
                .and_then(VecDeque::front)
                .cloned()
                .unwrap_or(Value::Int(0));
            Value::Array(vec![value])
        })
        .collect();
    Value::Array(results)
}
