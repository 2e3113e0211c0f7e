//! Canned torrent rows and raw records.

use spate_core::RawTorrent;
use spate_proto::Value;

/// Wire-shaped torrent row matching the poll field list in
/// `spate-daemon` (26 positional fields).
///
/// The torrent is active, public, downloading, added at a fixed
/// timestamp, tagged `linux`, and lives under `/data/downloads`.
#[must_use]
pub fn torrent_row(hash: &str, bytes_done: i64, size_bytes: i64) -> Value {
    Value::Array(vec![
        Value::string(hash),                      // d.hash=
        Value::string(format!("{hash}-name")),    // d.name=
        Value::string(""),                        // d.message=
        Value::Int(1),                            // d.state=
        Value::Int(1),                            // d.is_active=
        Value::Int(i64::from(bytes_done >= size_bytes)), // d.complete=
        Value::Int(0),                            // d.hashing=
        Value::Int(0),                            // d.is_private=
        Value::Int(size_bytes),                   // d.size_bytes=
        Value::Int(bytes_done),                   // d.completed_bytes=
        Value::Int(1_024),                        // d.up.rate=
        Value::Int(8_192),                        // d.down.rate=
        Value::Int(64_000),                       // d.up.total=
        Value::Int(128_000),                      // d.down.total=
        Value::Int(500),                          // d.ratio= (per mille)
        Value::string("1700000000"),              // d.custom=addtime
        Value::Int(1_699_900_000),                // d.creation_date=
        Value::Int(0),                            // d.timestamp.finished=
        Value::Int(1_700_000_500),                // d.timestamp.last_active=
        Value::Int(4),                            // d.peers_accounted=
        Value::Int(2),                            // d.peers_complete=
        Value::string("17"),                      // scrape incomplete
        Value::string("215"),                     // scrape complete
        Value::Int(0),                            // d.priority=
        Value::string("/data/downloads"),         // d.directory=
        Value::string("linux"),                   // d.custom1=
    ])
}

/// Parsed-form raw record for store and gateway tests.
#[must_use]
pub fn raw_torrent(hash: &str, bytes_done: u64, size_bytes: u64) -> RawTorrent {
    RawTorrent {
        hash: hash.to_string(),
        name: format!("{hash}-name"),
        state: 1,
        is_active: true,
        size_bytes,
        bytes_done,
        up_rate: 1_024,
        down_rate: 8_192,
        up_total: 64_000,
        down_total: 128_000,
        ratio: 0.5,
        date_added: 1_700_000_000,
        date_created: 1_699_900_000,
        date_active: 1_700_000_500,
        peers_connected: 4,
        peers_total: 17,
        seeds_connected: 2,
        seeds_total: 215,
        directory: "/data/downloads".to_string(),
        tags: vec!["linux".to_string()],
        trackers: vec!["https://tracker.example.org/announce".to_string()],
        ..RawTorrent::default()
    }
}
