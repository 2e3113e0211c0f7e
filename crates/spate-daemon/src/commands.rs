//! Typed command surface translated into batched daemon calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use spate_core::{DaemonSettings, RawTorrent, TransferSummary};
use spate_proto::{ProtocolError, Value};

use crate::error::DaemonError;
use crate::multicall::{
    MulticallOutcome, MulticallRequest, batch, expand, map_indexed_rows, map_keyed,
};
use crate::transport::DaemonTransport;

/// Poll field list issued with `d.multicall2`.
///
/// Order is load-bearing: `parse_torrent_row` consumes rows positionally.
/// The scrape totals ride an embedded tracker multicall whose results
/// are concatenated into one string per torrent.
const TORRENT_FIELDS: [&str; 26] = [
    "d.hash=",
    "d.name=",
    "d.message=",
    "d.state=",
    "d.is_active=",
    "d.complete=",
    "d.hashing=",
    "d.is_private=",
    "d.size_bytes=",
    "d.completed_bytes=",
    "d.up.rate=",
    "d.down.rate=",
    "d.up.total=",
    "d.down.total=",
    "d.ratio=",
    "d.custom=addtime",
    "d.creation_date=",
    "d.timestamp.finished=",
    "d.timestamp.last_active=",
    "d.peers_accounted=",
    "d.peers_complete=",
    "cat=\"$t.multicall=d.hash=,t.scrape_incomplete=,cat={}\"",
    "cat=\"$t.multicall=d.hash=,t.scrape_complete=,cat={}\"",
    "d.priority=",
    "d.directory=",
    "d.custom1=",
];

/// Keys batched for the settings fetch, in request order.
const SETTINGS_KEYS: [&str; 4] = [
    "directory.default",
    "network.port_range",
    "throttle.global_down.max_rate",
    "throttle.global_up.max_rate",
];

/// Keys batched for the transfer summary, in request order.
const TRANSFER_KEYS: [&str; 6] = [
    "throttle.global_up.rate",
    "throttle.global_down.rate",
    "throttle.global_up.total",
    "throttle.global_down.total",
    "throttle.global_up.max_rate",
    "throttle.global_down.max_rate",
];

/// Throttle target direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDirection {
    /// Global download cap.
    Down,
    /// Global upload cap.
    Up,
}

impl ThrottleDirection {
    const fn setter(self) -> &'static str {
        match self {
            Self::Down => "throttle.global_down.max_rate.set",
            Self::Up => "throttle.global_up.max_rate.set",
        }
    }
}

/// High-level daemon client: polls state and issues user commands, all
/// through the multicall batcher.
#[derive(Clone)]
pub struct DaemonClient {
    transport: Arc<dyn DaemonTransport>,
}

impl DaemonClient {
    /// Build a client over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn DaemonTransport>) -> Self {
        Self { transport }
    }

    /// Borrow the underlying transport seam.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn DaemonTransport> {
        &self.transport
    }

    /// Fetch the full raw torrent list, tracker URIs included.
    ///
    /// # Errors
    ///
    /// Returns a [`DaemonError`] when the daemon is unreachable, the
    /// response is malformed, or the daemon faults the request.
    pub async fn poll(&self) -> Result<Vec<RawTorrent>, DaemonError> {
        let mut params = vec![Value::string(""), Value::string("main")];
        params.extend(TORRENT_FIELDS.iter().map(|field| Value::string(*field)));
        let response = self.transport.call("d.multicall2", &params).await?;
        let rows = response.into_array().ok_or(ProtocolError::Malformed {
            context: "torrent list",
        })?;

        let mut raws: Vec<RawTorrent> = rows
            .iter()
            .map(parse_torrent_row)
            .collect::<Result<_, _>>()?;

        let hashes: Vec<String> = raws.iter().map(|raw| raw.hash.clone()).collect();
        let trackers = self.fetch_trackers(&hashes).await?;
        for raw in &mut raws {
            if let Some(uris) = trackers.get(&raw.hash) {
                raw.trackers.clone_from(uris);
            }
        }
        debug!(torrents = raws.len(), "poll fetched torrent list");
        Ok(raws)
    }

    /// Fetch tracker URIs for the given torrents in one batch.
    ///
    /// # Errors
    ///
    /// Returns a [`DaemonError`] on transport, protocol, or per-entry
    /// fault failures.
    pub async fn fetch_trackers(
        &self,
        hashes: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, DaemonError> {
        let requests: Vec<MulticallRequest> = hashes
            .iter()
            .map(|hash| {
                MulticallRequest::new(
                    "t.multicall",
                    vec![
                        Value::string(hash.clone()),
                        Value::string(""),
                        Value::string("t.url="),
                    ],
                )
            })
            .collect();

        let outcomes = batch(self.transport.as_ref(), &requests).await?;
        let mut mapped = BTreeMap::new();
        for (hash, outcome) in hashes.iter().zip(outcomes) {
            let values = outcome.into_values()?;
            let rows = values
                .first()
                .and_then(Value::as_array)
                .ok_or(ProtocolError::Malformed {
                    context: "tracker list",
                })?;
            let uris = map_indexed_rows(&["url"], rows)?
                .iter()
                .filter_map(|row| row.get("url"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            mapped.insert(hash.clone(), uris);
        }
        Ok(mapped)
    }

    /// Open and start the given torrents.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched so callers can report
    /// per-action failure.
    pub async fn start_torrents(&self, hashes: &[String]) -> Result<(), DaemonError> {
        let mut requests = Vec::with_capacity(hashes.len() * 2);
        for hash in hashes {
            requests.push(MulticallRequest::new(
                "d.open",
                vec![Value::string(hash.clone())],
            ));
            requests.push(MulticallRequest::new(
                "d.start",
                vec![Value::string(hash.clone())],
            ));
        }
        self.run(requests).await
    }

    /// Stop and close the given torrents.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn stop_torrents(&self, hashes: &[String]) -> Result<(), DaemonError> {
        let mut requests = Vec::with_capacity(hashes.len() * 2);
        for hash in hashes {
            requests.push(MulticallRequest::new(
                "d.stop",
                vec![Value::string(hash.clone())],
            ));
            requests.push(MulticallRequest::new(
                "d.close",
                vec![Value::string(hash.clone())],
            ));
        }
        self.run(requests).await
    }

    /// Queue a hash check for the given torrents.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn check_torrents(&self, hashes: &[String]) -> Result<(), DaemonError> {
        self.run(per_hash("d.check_hash", hashes)).await
    }

    /// Set the bandwidth priority for whole torrents.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn set_torrent_priority(
        &self,
        hashes: &[String],
        priority: i64,
    ) -> Result<(), DaemonError> {
        let requests = hashes
            .iter()
            .map(|hash| {
                MulticallRequest::new(
                    "d.priority.set",
                    vec![Value::string(hash.clone()), Value::Int(priority)],
                )
            })
            .collect();
        self.run(requests).await
    }

    /// Set a file priority across file indices and torrents.
    ///
    /// The logical operation expands into the Cartesian set of per-file
    /// calls, followed by one priority-refresh call per torrent.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn set_file_priority(
        &self,
        hashes: &[String],
        file_indices: &[i64],
        priority: i64,
    ) -> Result<(), DaemonError> {
        let mut requests = expand("f.priority.set", hashes, file_indices, |hash, index| {
            vec![Value::string(format!("{hash}:f{index}")), Value::Int(priority)]
        });
        requests.extend(per_hash("d.update_priorities", hashes));
        self.run(requests).await
    }

    /// Replace the tag set on the given torrents.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn set_tags(&self, hashes: &[String], tags: &[String]) -> Result<(), DaemonError> {
        let joined = tags.join(",");
        let requests = hashes
            .iter()
            .map(|hash| {
                MulticallRequest::new(
                    "d.custom1.set",
                    vec![Value::string(hash.clone()), Value::string(joined.clone())],
                )
            })
            .collect();
        self.run(requests).await
    }

    /// Attach tracker URIs to the given torrents.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn add_trackers(&self, hashes: &[String], uris: &[String]) -> Result<(), DaemonError> {
        let requests = expand("d.tracker.insert", hashes, uris, |hash, uri| {
            vec![
                Value::string(hash.clone()),
                Value::Int(0),
                Value::string(uri.clone()),
            ]
        });
        self.run(requests).await
    }

    /// Move torrent storage to a new directory.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn move_torrents(
        &self,
        hashes: &[String],
        destination: &str,
    ) -> Result<(), DaemonError> {
        let requests = hashes
            .iter()
            .map(|hash| {
                MulticallRequest::new(
                    "d.directory.set",
                    vec![
                        Value::string(hash.clone()),
                        Value::string(destination.to_string()),
                    ],
                )
            })
            .collect();
        self.run(requests).await
    }

    /// Remove torrents, optionally deleting their data.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn delete_torrents(
        &self,
        hashes: &[String],
        with_data: bool,
    ) -> Result<(), DaemonError> {
        let mut requests = Vec::with_capacity(hashes.len() * 2);
        for hash in hashes {
            if with_data {
                // The erase hook inspects this custom slot to decide
                // whether on-disk data goes too.
                requests.push(MulticallRequest::new(
                    "d.custom5.set",
                    vec![Value::string(hash.clone()), Value::string("1")],
                ));
            }
            requests.push(MulticallRequest::new(
                "d.erase",
                vec![Value::string(hash.clone())],
            ));
        }
        self.run(requests).await
    }

    /// Set a global throttle cap in bytes per second; zero lifts the cap.
    ///
    /// # Errors
    ///
    /// Propagates the first daemon fault untouched.
    pub async fn set_throttle(
        &self,
        direction: ThrottleDirection,
        limit_bps: u64,
    ) -> Result<(), DaemonError> {
        let requests = vec![MulticallRequest::new(
            direction.setter(),
            vec![
                Value::string(""),
                Value::Int(i64::try_from(limit_bps).unwrap_or(i64::MAX)),
            ],
        )];
        self.run(requests).await
    }

    /// Fetch daemon-wide settings.
    ///
    /// # Errors
    ///
    /// Returns a [`DaemonError`] on transport/protocol failures or a
    /// daemon fault.
    pub async fn fetch_settings(&self) -> Result<DaemonSettings, DaemonError> {
        let outcomes = self.fetch_keyed(&SETTINGS_KEYS).await?;
        let mapped = map_keyed(&SETTINGS_KEYS, outcomes)?;
        Ok(DaemonSettings {
            default_directory: str_value(&mapped, "directory.default"),
            port_range: str_value(&mapped, "network.port_range"),
            down_throttle_max: u64_value(&mapped, "throttle.global_down.max_rate"),
            up_throttle_max: u64_value(&mapped, "throttle.global_up.max_rate"),
        })
    }

    /// Fetch the global transfer summary.
    ///
    /// # Errors
    ///
    /// Returns a [`DaemonError`] on transport/protocol failures or a
    /// daemon fault.
    pub async fn fetch_transfer_summary(&self) -> Result<TransferSummary, DaemonError> {
        let outcomes = self.fetch_keyed(&TRANSFER_KEYS).await?;
        let mapped = map_keyed(&TRANSFER_KEYS, outcomes)?;
        Ok(TransferSummary {
            up_rate: u64_value(&mapped, "throttle.global_up.rate"),
            down_rate: u64_value(&mapped, "throttle.global_down.rate"),
            up_total: u64_value(&mapped, "throttle.global_up.total"),
            down_total: u64_value(&mapped, "throttle.global_down.total"),
            up_throttle: u64_value(&mapped, "throttle.global_up.max_rate"),
            down_throttle: u64_value(&mapped, "throttle.global_down.max_rate"),
        })
    }

    async fn fetch_keyed(&self, keys: &[&str]) -> Result<Vec<MulticallOutcome>, DaemonError> {
        let requests: Vec<MulticallRequest> = keys
            .iter()
            .map(|key| MulticallRequest::new(*key, vec![Value::string("")]))
            .collect();
        batch(self.transport.as_ref(), &requests).await
    }

    async fn run(&self, requests: Vec<MulticallRequest>) -> Result<(), DaemonError> {
        let outcomes = batch(self.transport.as_ref(), &requests).await?;
        for outcome in outcomes {
            if let MulticallOutcome::Fault(fault) = outcome {
                return Err(DaemonError::Fault(fault));
            }
        }
        Ok(())
    }
}

fn per_hash(method: &str, hashes: &[String]) -> Vec<MulticallRequest> {
    hashes
        .iter()
        .map(|hash| MulticallRequest::new(method, vec![Value::string(hash.clone())]))
        .collect()
}

fn str_value(mapped: &BTreeMap<String, Value>, key: &str) -> String {
    mapped
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn u64_value(mapped: &BTreeMap<String, Value>, key: &str) -> u64 {
    mapped
        .get(key)
        .and_then(Value::as_i64)
        .map_or(0, |value| u64::try_from(value).unwrap_or(0))
}

fn parse_torrent_row(row: &Value) -> Result<RawTorrent, DaemonError> {
    let fields = row.as_array().ok_or(ProtocolError::Malformed {
        context: "torrent row",
    })?;
    if fields.len() != TORRENT_FIELDS.len() {
        return Err(ProtocolError::Malformed {
            context: "torrent row",
        }
        .into());
    }

    Ok(RawTorrent {
        hash: field_str(fields, 0)?.to_string(),
        name: field_str(fields, 1)?.to_string(),
        message: field_str(fields, 2)?.to_string(),
        state: field_i64(fields, 3)?,
        is_active: field_i64(fields, 4)? != 0,
        is_complete: field_i64(fields, 5)? != 0,
        is_hash_checking: field_i64(fields, 6)? != 0,
        is_private: field_i64(fields, 7)? != 0,
        size_bytes: field_u64(fields, 8)?,
        bytes_done: field_u64(fields, 9)?,
        up_rate: field_u64(fields, 10)?,
        down_rate: field_u64(fields, 11)?,
        up_total: field_u64(fields, 12)?,
        down_total: field_u64(fields, 13)?,
        ratio: per_mille(field_i64(fields, 14)?),
        date_added: lenient_i64(fields, 15),
        date_created: field_i64(fields, 16)?,
        date_finished: field_i64(fields, 17)?,
        date_active: field_i64(fields, 18)?,
        peers_connected: field_u32(fields, 19)?,
        seeds_connected: field_u32(fields, 20)?,
        peers_total: scrape_total(fields, 21),
        seeds_total: scrape_total(fields, 22),
        priority: field_i64(fields, 23)?,
        directory: field_str(fields, 24)?.to_string(),
        tags: split_tags(field_str(fields, 25)?),
        trackers: Vec::new(),
    })
}

fn field_value<'a>(fields: &'a [Value], index: usize) -> Result<&'a Value, DaemonError> {
    fields.get(index).ok_or_else(|| {
        ProtocolError::Malformed {
            context: "torrent row",
        }
        .into()
    })
}

fn field_str<'a>(fields: &'a [Value], index: usize) -> Result<&'a str, DaemonError> {
    field_value(fields, index)?.as_str().ok_or_else(|| {
        ProtocolError::Malformed {
            context: "torrent row",
        }
        .into()
    })
}

fn field_i64(fields: &[Value], index: usize) -> Result<i64, DaemonError> {
    field_value(fields, index)?.as_i64().ok_or_else(|| {
        ProtocolError::Malformed {
            context: "torrent row",
        }
        .into()
    })
}

fn field_u64(fields: &[Value], index: usize) -> Result<u64, DaemonError> {
    Ok(u64::try_from(field_i64(fields, index)?).unwrap_or(0))
}

fn field_u32(fields: &[Value], index: usize) -> Result<u32, DaemonError> {
    Ok(u32::try_from(field_i64(fields, index)?).unwrap_or(0))
}

/// `d.custom=addtime` is absent on torrents added outside the gateway;
/// treat anything unparsable as epoch.
fn lenient_i64(fields: &[Value], index: usize) -> i64 {
    fields.get(index).and_then(Value::as_i64).unwrap_or(0)
}

fn per_mille(value: i64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "ratio per-mille values are far below f64 precision limits"
    )]
    {
        value as f64 / 1_000.0
    }
}

/// The embedded tracker multicall concatenates every tracker's scrape
/// figure into one string; only the leading integer (the first
/// tracker's figure) is usable.
fn scrape_total(fields: &[Value], index: usize) -> u32 {
    let Some(value) = fields.get(index) else {
        return 0;
    };
    let text = match value {
        Value::Int(number) => return u32::try_from(*number).unwrap_or(0),
        other => other.as_str().unwrap_or(""),
    };
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_totals_take_the_leading_integer() {
        let fields = vec![Value::string("43abc")];
        assert_eq!(scrape_total(&fields, 0), 43);
        let empty = vec![Value::string("")];
        assert_eq!(scrape_total(&empty, 0), 0);
        let numeric = vec![Value::Int(12)];
        assert_eq!(scrape_total(&numeric, 0), 12);
    }

    #[test]
    fn tags_split_on_commas_and_drop_blanks() {
        assert_eq!(
            split_tags("tv, film ,,iso"),
            vec!["tv".to_string(), "film".to_string(), "iso".to_string()]
        );
        assert!(split_tags("").is_empty());
    }
}
