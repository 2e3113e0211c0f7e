//! Request batching and response mapping.
//!
//! Many logical operations (per-torrent settings, bulk property fetches)
//! are aggregated into a single `system.multicall` round-trip; the flat
//! response arrays are mapped back onto the originating keys or torrents
//! in input order.

use std::collections::BTreeMap;

use spate_proto::{ProtocolError, Value, fault_entry};

use crate::error::DaemonError;
use crate::transport::DaemonTransport;

/// One logical call inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MulticallRequest {
    /// Remote method name.
    pub method: String,
    /// Ordered parameters.
    pub params: Vec<Value>,
}

impl MulticallRequest {
    /// Build a request from a method name and its parameters.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Per-request outcome of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum MulticallOutcome {
    /// The request succeeded; one result array per the protocol.
    Values(Vec<Value>),
    /// The daemon faulted this request; the rest of the batch stands.
    Fault(spate_proto::DaemonFault),
}

impl MulticallOutcome {
    /// Unwrap the result array, converting a per-entry fault into the
    /// client error type.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Fault`] when the daemon faulted this entry.
    pub fn into_values(self) -> Result<Vec<Value>, DaemonError> {
        match self {
            Self::Values(values) => Ok(values),
            Self::Fault(fault) => Err(DaemonError::Fault(fault)),
        }
    }
}

/// Issue all requests as a single batched call.
///
/// One outcome is returned per request, preserving input order. An empty
/// request list resolves immediately without touching the transport.
///
/// # Errors
///
/// Returns a [`DaemonError`] when the batched call itself fails; faults
/// scoped to individual entries surface as [`MulticallOutcome::Fault`].
pub async fn batch(
    transport: &dyn DaemonTransport,
    requests: &[MulticallRequest],
) -> Result<Vec<MulticallOutcome>, DaemonError> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let call_list = Value::Array(
        requests
            .iter()
            .map(|request| {
                let mut members = BTreeMap::new();
                members.insert(
                    "methodName".to_string(),
                    Value::string(request.method.clone()),
                );
                members.insert("params".to_string(), Value::Array(request.params.clone()));
                Value::Struct(members)
            })
            .collect(),
    );

    let response = transport.call("system.multicall", &[call_list]).await?;
    let entries = response.into_array().ok_or(ProtocolError::Malformed {
        context: "multicall response",
    })?;
    if entries.len() != requests.len() {
        return Err(ProtocolError::Malformed {
            context: "multicall response",
        }
        .into());
    }

    entries
        .into_iter()
        .map(|entry| {
            if let Some(fault) = fault_entry(&entry) {
                return Ok(MulticallOutcome::Fault(fault));
            }
            entry
                .into_array()
                .map(MulticallOutcome::Values)
                .ok_or_else(|| {
                    ProtocolError::Malformed {
                        context: "multicall entry",
                    }
                    .into()
                })
        })
        .collect()
}

/// Expand one logical operation into the Cartesian set of per-item
/// requests, ready for batching.
pub fn expand<M, I>(
    method: &str,
    majors: &[M],
    minors: &[I],
    build_params: impl Fn(&M, &I) -> Vec<Value>,
) -> Vec<MulticallRequest> {
    let mut requests = Vec::with_capacity(majors.len() * minors.len());
    for major in majors {
        for minor in minors {
            requests.push(MulticallRequest::new(method, build_params(major, minor)));
        }
    }
    requests
}

/// Map a scalar multi-get back onto its parallel key list.
///
/// Each outcome must carry exactly one value (the protocol wraps every
/// result in a single-element array).
///
/// # Errors
///
/// Returns a [`DaemonError`] on arity mismatch or a per-entry fault.
pub fn map_keyed(
    keys: &[&str],
    outcomes: Vec<MulticallOutcome>,
) -> Result<BTreeMap<String, Value>, DaemonError> {
    if keys.len() != outcomes.len() {
        return Err(ProtocolError::Malformed {
            context: "keyed response",
        }
        .into());
    }
    let mut mapped = BTreeMap::new();
    for (key, outcome) in keys.iter().zip(outcomes) {
        let mut values = outcome.into_values()?;
        if values.len() != 1 {
            return Err(ProtocolError::Malformed {
                context: "keyed response",
            }
            .into());
        }
        mapped.insert((*key).to_string(), values.remove(0));
    }
    Ok(mapped)
}

/// Map a homogeneous list fetch (peers/files/trackers) onto named rows.
///
/// Every row is matched positionally against `keys` and given an
/// injected `index` member recording its position.
///
/// # Errors
///
/// Returns a [`DaemonError`] when a row is not an array or its arity
/// does not match the key list.
pub fn map_indexed_rows(
    keys: &[&str],
    rows: &[Value],
) -> Result<Vec<BTreeMap<String, Value>>, DaemonError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let fields = row.as_array().ok_or(ProtocolError::Malformed {
                context: "indexed row",
            })?;
            if fields.len() != keys.len() {
                return Err(ProtocolError::Malformed {
                    context: "indexed row",
                }
                .into());
            }
            let mut mapped: BTreeMap<String, Value> = keys
                .iter()
                .zip(fields)
                .map(|(key, value)| ((*key).to_string(), value.clone()))
                .collect();
            mapped.insert(
                "index".to_string(),
                Value::Int(i64::try_from(index).unwrap_or(i64::MAX)),
            );
            Ok(mapped)
        })
        .collect()
}
